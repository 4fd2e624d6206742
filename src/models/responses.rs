use serde::{Deserialize, Serialize};

use crate::core::pagination::PageItem;
use crate::models::domain::{Building, IndividualArchitect, SearchHistoryEntry};
use crate::services::cache::CacheStats;

/// Response for the building search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub buildings: Vec<Building>,
    pub total: usize,
    pub page: u32,
    pub total_pages: u32,
    pub pagination: Vec<PageItem>,
}

/// Architects credited on one building
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingArchitects {
    pub building_id: i64,
    pub individuals: Vec<IndividualArchitect>,
    /// Names split out of pre-migration credits
    pub legacy_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub session_id: String,
    pub entries: Vec<SearchHistoryEntry>,
    /// Most searched entries first
    pub popular: Vec<SearchHistoryEntry>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Absent when caching is off
    pub cache: Option<CacheStats>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
