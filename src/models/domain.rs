use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Full-width space used by pre-migration records to join several architect names
pub const LEGACY_NAME_DELIMITER: char = '\u{3000}';

/// Display/search language. Selects which bilingual column a facet reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ja,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
        }
    }

    /// Parse a language code, falling back to Japanese for anything unknown
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Language::En,
            _ => Language::Ja,
        }
    }
}

/// Canonical person-level architect identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualArchitect {
    pub individual_architect_id: i64,
    pub name_ja: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub slug: String,
}

impl IndividualArchitect {
    pub fn name(&self, language: Language) -> &str {
        match language {
            Language::Ja => &self.name_ja,
            Language::En => self.name_en.as_deref().unwrap_or(&self.name_ja),
        }
    }
}

/// How a composite credit decomposes into people
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "individuals", rename_all = "snake_case")]
pub enum ArchitectMembers {
    /// Migrated record: ordered, deduplicated composition rows
    Composed(Vec<IndividualArchitect>),
    /// Pre-migration record: the composite name holds several names joined by a full-width space
    LegacyDelimited,
}

/// A credit entry on a building (a person, a firm or a team)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeArchitect {
    pub architect_id: i64,
    pub name_ja: String,
    pub name_en: Option<String>,
    pub slug: Option<String>,
    pub order: i32,
    pub members: ArchitectMembers,
}

impl CompositeArchitect {
    /// Names a user can see and filter on for this credit
    pub fn display_names(&self, language: Language) -> Vec<String> {
        match &self.members {
            ArchitectMembers::Composed(individuals) => individuals
                .iter()
                .map(|a| a.name(language).to_string())
                .collect(),
            ArchitectMembers::LegacyDelimited => {
                let raw = match language {
                    Language::Ja => self.name_ja.as_str(),
                    Language::En => self.name_en.as_deref().unwrap_or(&self.name_ja),
                };
                split_legacy_names(raw)
            }
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self.members, ArchitectMembers::LegacyDelimited)
    }
}

/// Split a legacy architect name on the full-width space, dropping empty segments
pub fn split_legacy_names(raw: &str) -> Vec<String> {
    raw.split(LEGACY_NAME_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub likes: i64,
}

/// Transformed, validated building record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: i64,
    pub slug: Option<String>,
    pub title: String,
    pub title_en: Option<String>,
    pub location: Option<String>,
    pub location_en: Option<String>,
    pub prefecture: Option<String>,
    pub prefecture_en: Option<String>,
    pub area: Option<String>,
    pub building_types: Vec<String>,
    pub building_types_en: Vec<String>,
    pub structures: Vec<String>,
    pub structures_en: Vec<String>,
    pub completion_year: Option<i32>,
    pub latitude: f64,
    pub longitude: f64,
    pub architects: Vec<CompositeArchitect>,
    pub photos: Vec<Photo>,
    pub thumbnail_url: Option<String>,
    pub youtube_url: Option<String>,
    pub likes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl Building {
    pub fn building_types_for(&self, language: Language) -> &[String] {
        match language {
            Language::Ja => &self.building_types,
            Language::En => &self.building_types_en,
        }
    }

    pub fn prefecture_for(&self, language: Language) -> Option<&str> {
        match language {
            Language::Ja => self.prefecture.as_deref(),
            Language::En => self.prefecture_en.as_deref(),
        }
    }

    /// Every displayable architect name in the given language, credit order preserved
    pub fn architect_names(&self, language: Language) -> Vec<String> {
        self.architects
            .iter()
            .flat_map(|a| a.display_names(language))
            .collect()
    }

    pub fn has_photos(&self) -> bool {
        !self.photos.is_empty()
    }

    pub fn has_video(&self) -> bool {
        self.youtube_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

pub const DEFAULT_RADIUS_KM: u32 = 5;

/// Immutable description of the active query.
///
/// List fields are sets: membership matters, order does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub query: String,
    pub radius: u32,
    pub current_location: Option<GeoPoint>,
    pub architects: BTreeSet<String>,
    pub building_types: BTreeSet<String>,
    pub prefectures: BTreeSet<String>,
    pub areas: BTreeSet<String>,
    pub has_photos: bool,
    pub has_videos: bool,
    pub completion_year: Option<i32>,
    pub exclude_residential: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            query: String::new(),
            radius: DEFAULT_RADIUS_KM,
            current_location: None,
            architects: BTreeSet::new(),
            building_types: BTreeSet::new(),
            prefectures: BTreeSet::new(),
            areas: BTreeSet::new(),
            has_photos: false,
            has_videos: false,
            completion_year: None,
            exclude_residential: true,
        }
    }
}

impl FilterState {
    pub fn trimmed_query(&self) -> Option<&str> {
        let q = self.query.trim();
        (!q.is_empty()).then_some(q)
    }

    /// True when no facet narrows the collection.
    ///
    /// Residential exclusion is a facet: a default state is not unfiltered.
    pub fn is_unfiltered(&self) -> bool {
        self.trimmed_query().is_none()
            && self.current_location.is_none()
            && self.architects.is_empty()
            && self.building_types.is_empty()
            && self.prefectures.is_empty()
            && self.areas.is_empty()
            && !self.has_photos
            && !self.has_videos
            && self.completion_year.is_none()
            && !self.exclude_residential
    }

    /// Same state with every facet switched off
    pub fn cleared() -> Self {
        Self {
            exclude_residential: false,
            ..Self::default()
        }
    }
}

/// How a history entry is replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Text,
    Architect,
    Prefecture,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::Text => "text",
            HistoryKind::Architect => "architect",
            HistoryKind::Prefecture => "prefecture",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(HistoryKind::Text),
            "architect" => Some(HistoryKind::Architect),
            "prefecture" => Some(HistoryKind::Prefecture),
            _ => None,
        }
    }
}

/// Facet fragment stored with architect/prefecture history entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterFragment {
    #[serde(default)]
    pub architects: BTreeSet<String>,
    #[serde(default)]
    pub prefectures: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub query: String,
    pub searched_at: chrono::DateTime<chrono::Utc>,
    pub count: u32,
    #[serde(default)]
    pub kind: Option<HistoryKind>,
    #[serde(default)]
    pub filters: Option<FilterFragment>,
}

impl SearchHistoryEntry {
    /// Entries without a discriminator predate it and are plain text searches
    pub fn effective_kind(&self) -> HistoryKind {
        self.kind.unwrap_or(HistoryKind::Text)
    }
}

/// One page of results. `total` counts records before per-record validation skips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub buildings: Vec<Building>,
    pub total: usize,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self::default()
    }
}
