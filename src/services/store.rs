use async_trait::async_trait;
use thiserror::Error;

use crate::core::planner::QueryPlan;
use crate::models::{CompositionRow, CreditRow, IndividualArchitect, Language, RowPage};

/// Errors that can occur when talking to the backing data store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Parameters of the backend distance ranking call
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRankParams {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
    pub query: Option<String>,
    pub architects: Option<Vec<String>>,
    pub building_types: Option<Vec<String>>,
    pub prefectures: Option<Vec<String>>,
    pub areas: Option<Vec<String>>,
    pub has_videos: bool,
    pub completion_year: Option<i32>,
    pub exclude_residential: bool,
    pub language: Language,
    pub offset: usize,
    /// `None` returns every ranked row from `offset`
    pub limit: Option<usize>,
}

/// The external data store.
///
/// Architect hops each take the previous hop's identifiers, so callers
/// must await them in sequence.
#[async_trait]
pub trait BuildingStore: Send + Sync {
    /// Individuals whose language-selected name contains any of `names` (case-insensitive)
    async fn find_individuals(
        &self,
        names: &[String],
        language: Language,
    ) -> Result<Vec<IndividualArchitect>, StoreError>;

    /// Composite ids of pre-migration credits whose stored name contains any of `names`
    async fn find_legacy_composites(
        &self,
        names: &[String],
        language: Language,
    ) -> Result<Vec<i64>, StoreError>;

    async fn compositions_for_individuals(
        &self,
        individual_ids: &[i64],
    ) -> Result<Vec<CompositionRow>, StoreError>;

    async fn credits_for_composites(&self, composite_ids: &[i64]) -> Result<Vec<CreditRow>, StoreError>;

    /// Credits of one building with the composite row embedded
    async fn credits_for_building(&self, building_id: i64) -> Result<Vec<CreditRow>, StoreError>;

    async fn compositions_for_composites(
        &self,
        composite_ids: &[i64],
    ) -> Result<Vec<CompositionRow>, StoreError>;

    async fn individuals_by_ids(&self, ids: &[i64]) -> Result<Vec<IndividualArchitect>, StoreError>;

    /// One page of the filtered collection, newest first
    async fn fetch_page(&self, plan: &QueryPlan, offset: usize, limit: usize) -> Result<RowPage, StoreError>;

    /// Every row matching the plan, unpaginated
    async fn fetch_all(&self, plan: &QueryPlan) -> Result<RowPage, StoreError>;

    /// Distance-ranked, pre-paginated rows with `distance` attached
    async fn rank_by_distance(&self, params: &DistanceRankParams) -> Result<RowPage, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
