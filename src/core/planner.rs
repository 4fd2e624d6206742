//! Combines filter facets, free text and architect resolution into one backend query.
//!
//! Free text is a single OR-group (substring columns, or membership in the set of
//! buildings credited to an architect whose name contains the text). Every other
//! facet is an independent AND-constraint. Has-photos is not a storage predicate:
//! it runs after transformation, see [`QueryPlan::apply_post_transform`].

use std::collections::BTreeSet;

use crate::core::architects::ArchitectNameResolver;
use crate::core::distance::is_within_bounding_box;
use crate::core::filters::{contains_ignore_case, RESIDENTIAL_EN, RESIDENTIAL_JA};
use crate::core::transform::parse_year;
use crate::models::{BoundingBox, Building, BuildingRow, FilterState, Language};
use crate::services::store::StoreError;

/// Columns searched by the free-text OR-group
pub const TEXT_COLUMNS: [&str; 6] = [
    "title",
    "title_en",
    "location",
    "location_en",
    "building_types",
    "building_types_en",
];

/// One storage-level predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Substring over [`TEXT_COLUMNS`] OR id in `associated_ids`
    Text {
        term: String,
        associated_ids: BTreeSet<i64>,
    },
    /// Explicit architect selection
    IdIn(BTreeSet<i64>),
    /// Any value is a substring of the language-selected type column
    BuildingTypesAny {
        language: Language,
        values: Vec<String>,
    },
    PrefectureIn {
        language: Language,
        values: Vec<String>,
    },
    AreaIn(Vec<String>),
    HasVideo,
    CompletionYear(i32),
    ExcludeResidential,
    Within(BoundingBox),
}

impl Clause {
    /// Evaluate against a raw backend row the way the store would
    pub fn matches_row(&self, row: &BuildingRow) -> bool {
        match self {
            Clause::Text {
                term,
                associated_ids,
            } => {
                let columns = [
                    Some(row.title.as_str()),
                    row.title_en.as_deref(),
                    row.location.as_deref(),
                    row.location_en.as_deref(),
                    row.building_types.as_deref(),
                    row.building_types_en.as_deref(),
                ];
                columns
                    .iter()
                    .flatten()
                    .any(|c| contains_ignore_case(c, term))
                    || associated_ids.contains(&row.building_id)
            }
            Clause::IdIn(ids) => ids.contains(&row.building_id),
            Clause::BuildingTypesAny { language, values } => {
                let column = match language {
                    Language::Ja => row.building_types.as_deref(),
                    Language::En => row.building_types_en.as_deref(),
                };
                column
                    .map(|c| values.iter().any(|v| contains_ignore_case(c, v)))
                    .unwrap_or(false)
            }
            Clause::PrefectureIn { language, values } => {
                let column = match language {
                    Language::Ja => row.prefecture.as_deref(),
                    Language::En => row.prefecture_en.as_deref(),
                };
                column.map(|c| values.iter().any(|v| v == c)).unwrap_or(false)
            }
            Clause::AreaIn(values) => row
                .area
                .as_deref()
                .map(|a| values.iter().any(|v| v == a))
                .unwrap_or(false),
            Clause::HasVideo => row
                .youtube_url
                .as_deref()
                .map(|u| !u.trim().is_empty())
                .unwrap_or(false),
            Clause::CompletionYear(year) => parse_year(row.completion_years.as_deref()) == Some(*year),
            Clause::ExcludeResidential => {
                let ja = row
                    .building_types
                    .as_deref()
                    .map(|t| t.contains(RESIDENTIAL_JA))
                    .unwrap_or(false);
                let en = row
                    .building_types_en
                    .as_deref()
                    .map(|t| contains_ignore_case(t, RESIDENTIAL_EN))
                    .unwrap_or(false);
                !ja && !en
            }
            Clause::Within(bbox) => row
                .coordinates()
                .map(|(lat, lng)| is_within_bounding_box(lat, lng, bbox))
                .unwrap_or(false),
        }
    }
}

/// A complete query: AND of clauses, plus post-transform predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    pub clauses: Vec<Clause>,
    /// Has-photos, evaluated after transformation
    pub require_photos: bool,
    /// An explicit constraint resolved to nothing: skip the backend entirely
    pub unsatisfiable: bool,
}

impl QueryPlan {
    pub fn matches_row(&self, row: &BuildingRow) -> bool {
        !self.unsatisfiable && self.clauses.iter().all(|c| c.matches_row(row))
    }

    /// Same plan clamped to a bounding box
    pub fn within(&self, bbox: BoundingBox) -> Self {
        let mut plan = self.clone();
        plan.clauses.push(Clause::Within(bbox));
        plan
    }

    pub fn apply_post_transform(&self, buildings: Vec<Building>) -> Vec<Building> {
        if !self.require_photos {
            return buildings;
        }
        buildings.into_iter().filter(Building::has_photos).collect()
    }
}

/// Build a plan from already-resolved architect sets.
///
/// `text_ids` are buildings associated with the free text through architect
/// names; `architect_ids` is `Some` when architects were explicitly selected.
/// Clauses are emitted in one canonical order.
pub fn build_plan(
    filters: &FilterState,
    language: Language,
    text_ids: BTreeSet<i64>,
    architect_ids: Option<BTreeSet<i64>>,
) -> QueryPlan {
    let mut plan = QueryPlan {
        require_photos: filters.has_photos,
        ..QueryPlan::default()
    };

    if let Some(term) = filters.trimmed_query() {
        plan.clauses.push(Clause::Text {
            term: term.to_string(),
            associated_ids: text_ids,
        });
    }

    if let Some(ids) = architect_ids {
        if ids.is_empty() {
            plan.unsatisfiable = true;
        }
        plan.clauses.push(Clause::IdIn(ids));
    }

    if !filters.building_types.is_empty() {
        plan.clauses.push(Clause::BuildingTypesAny {
            language,
            values: filters.building_types.iter().cloned().collect(),
        });
    }

    if !filters.prefectures.is_empty() {
        plan.clauses.push(Clause::PrefectureIn {
            language,
            values: filters.prefectures.iter().cloned().collect(),
        });
    }

    if !filters.areas.is_empty() {
        plan.clauses
            .push(Clause::AreaIn(filters.areas.iter().cloned().collect()));
    }

    if filters.has_videos {
        plan.clauses.push(Clause::HasVideo);
    }

    if let Some(year) = filters.completion_year {
        plan.clauses.push(Clause::CompletionYear(year));
    }

    if filters.exclude_residential {
        plan.clauses.push(Clause::ExcludeResidential);
    }

    plan
}

/// Resolves architect facets through the store, then builds the plan
#[derive(Clone)]
pub struct QueryPlanner {
    resolver: ArchitectNameResolver,
}

impl QueryPlanner {
    pub fn new(resolver: ArchitectNameResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ArchitectNameResolver {
        &self.resolver
    }

    pub async fn plan(&self, filters: &FilterState, language: Language) -> Result<QueryPlan, StoreError> {
        let text_ids = match filters.trimmed_query() {
            Some(term) => {
                self.resolver
                    .resolve_buildings(&[term.to_string()], language)
                    .await?
            }
            None => BTreeSet::new(),
        };

        let architect_ids = if filters.architects.is_empty() {
            None
        } else {
            let names: Vec<String> = filters.architects.iter().cloned().collect();
            Some(self.resolver.resolve_buildings(&names, language).await?)
        };

        let plan = build_plan(filters, language, text_ids, architect_ids);
        tracing::debug!(
            "Planned query with {} clauses (unsatisfiable: {})",
            plan.clauses.len(),
            plan.unsatisfiable
        );
        Ok(plan)
    }
}
