use serde::{Deserialize, Serialize};

use crate::models::domain::IndividualArchitect;

/// A numeric column as the backend may deliver it: number, numeric string, or garbage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            RawNumber::Number(n) => *n,
            RawNumber::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

/// Composition relation row: composite architect -> individual architect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionRow {
    pub architect_id: i64,
    pub individual_architect_id: i64,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub individual: Option<IndividualArchitect>,
}

/// Composite architect row, optionally with its composition rows embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRow {
    pub architect_id: i64,
    pub name_ja: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub compositions: Vec<CompositionRow>,
}

/// Building credit relation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRow {
    pub building_id: i64,
    pub architect_id: i64,
    #[serde(default)]
    pub architect_order: i32,
    #[serde(default)]
    pub architect: Option<CompositeRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRow {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub likes: Option<i64>,
}

/// Building as stored by the backend.
///
/// `building_types` is slash-delimited, `structures` is comma-delimited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingRow {
    pub building_id: i64,
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub location_en: Option<String>,
    #[serde(default)]
    pub prefecture: Option<String>,
    #[serde(default)]
    pub prefecture_en: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub building_types: Option<String>,
    #[serde(default)]
    pub building_types_en: Option<String>,
    #[serde(default)]
    pub structures: Option<String>,
    #[serde(default)]
    pub structures_en: Option<String>,
    #[serde(default)]
    pub completion_years: Option<String>,
    #[serde(default)]
    pub lat: Option<RawNumber>,
    #[serde(default)]
    pub lng: Option<RawNumber>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(default)]
    pub photos: Vec<PhotoRow>,
    #[serde(default)]
    pub building_architects: Vec<CreditRow>,
    /// Attached by the ranking call only
    #[serde(default)]
    pub distance: Option<f64>,
}

impl BuildingRow {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat.as_ref()?.as_f64()?, self.lng.as_ref()?.as_f64()?))
    }
}

/// Rows of one backend page plus the backend's total for the whole query
#[derive(Debug, Clone, Default)]
pub struct RowPage {
    pub rows: Vec<BuildingRow>,
    pub total: usize,
}
