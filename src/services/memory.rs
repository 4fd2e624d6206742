use async_trait::async_trait;
use std::time::Duration;

use crate::core::architects::ArchitectIndex;
use crate::core::distance::haversine_distance;
use crate::core::planner::{build_plan, QueryPlan};
use crate::models::{
    BuildingRow, CompositionRow, CreditRow, FilterState, IndividualArchitect, Language, RowPage,
};
use crate::services::store::{BuildingStore, DistanceRankParams, StoreError};

/// Behaviour of the in-memory distance ranking call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMode {
    Enabled,
    /// Behaves like a backend without the ranking function installed
    Disabled,
    /// Answers only after the given delay
    Delayed(Duration),
}

/// Backend over a snapshot of rows held in memory
pub struct MemoryStore {
    rows: Vec<BuildingRow>,
    index: ArchitectIndex,
    ranking: RankingMode,
}

impl MemoryStore {
    pub fn new(rows: Vec<BuildingRow>) -> Self {
        let index = ArchitectIndex::from_rows(&rows);
        tracing::debug!(
            "Memory store holds {} buildings, {} individual architects",
            rows.len(),
            index.individual_count()
        );
        Self {
            rows,
            index,
            ranking: RankingMode::Enabled,
        }
    }

    pub fn with_ranking(mut self, ranking: RankingMode) -> Self {
        self.ranking = ranking;
        self
    }

    /// Matching rows, newest first
    fn select(&self, plan: &QueryPlan) -> Vec<BuildingRow> {
        let mut matched: Vec<BuildingRow> = self
            .rows
            .iter()
            .filter(|row| plan.matches_row(row))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.building_id.cmp(&a.building_id));
        matched
    }

    fn rank(&self, params: &DistanceRankParams) -> RowPage {
        let filters = FilterState {
            query: params.query.clone().unwrap_or_default(),
            architects: params.architects.iter().flatten().cloned().collect(),
            building_types: params.building_types.iter().flatten().cloned().collect(),
            prefectures: params.prefectures.iter().flatten().cloned().collect(),
            areas: params.areas.iter().flatten().cloned().collect(),
            has_videos: params.has_videos,
            completion_year: params.completion_year,
            exclude_residential: params.exclude_residential,
            ..FilterState::cleared()
        };

        let text_ids = match filters.trimmed_query() {
            Some(q) => self
                .index
                .buildings_for_names(&[q.to_string()], params.language),
            None => Default::default(),
        };
        let architect_ids = (!filters.architects.is_empty()).then(|| {
            let names: Vec<String> = filters.architects.iter().cloned().collect();
            self.index.buildings_for_names(&names, params.language)
        });
        let plan = build_plan(&filters, params.language, text_ids, architect_ids);

        let mut ranked: Vec<BuildingRow> = self
            .rows
            .iter()
            .filter(|row| plan.matches_row(row))
            .filter_map(|row| {
                let (lat, lng) = row.coordinates()?;
                let distance = haversine_distance(params.lat, params.lng, lat, lng);
                (distance <= params.radius_km).then(|| BuildingRow {
                    distance: Some(distance),
                    ..row.clone()
                })
            })
            .collect();
        ranked.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total = ranked.len();
        RowPage {
            rows: ranked
                .into_iter()
                .skip(params.offset)
                .take(params.limit.unwrap_or(usize::MAX))
                .collect(),
            total,
        }
    }
}

#[async_trait]
impl BuildingStore for MemoryStore {
    async fn find_individuals(
        &self,
        names: &[String],
        language: Language,
    ) -> Result<Vec<IndividualArchitect>, StoreError> {
        Ok(self.index.find_individuals(names, language))
    }

    async fn find_legacy_composites(&self, names: &[String], language: Language) -> Result<Vec<i64>, StoreError> {
        Ok(self.index.find_legacy_composites(names, language))
    }

    async fn compositions_for_individuals(&self, individual_ids: &[i64]) -> Result<Vec<CompositionRow>, StoreError> {
        Ok(self.index.compositions_for_individuals(individual_ids))
    }

    async fn credits_for_composites(&self, composite_ids: &[i64]) -> Result<Vec<CreditRow>, StoreError> {
        Ok(self.index.credits_for_composites(composite_ids))
    }

    async fn credits_for_building(&self, building_id: i64) -> Result<Vec<CreditRow>, StoreError> {
        Ok(self.index.credits_for_building(building_id))
    }

    async fn compositions_for_composites(&self, composite_ids: &[i64]) -> Result<Vec<CompositionRow>, StoreError> {
        Ok(self.index.compositions_for_composites(composite_ids))
    }

    async fn individuals_by_ids(&self, ids: &[i64]) -> Result<Vec<IndividualArchitect>, StoreError> {
        Ok(self.index.individuals_by_ids(ids))
    }

    async fn fetch_page(&self, plan: &QueryPlan, offset: usize, limit: usize) -> Result<RowPage, StoreError> {
        let matched = self.select(plan);
        let total = matched.len();
        Ok(RowPage {
            rows: matched.into_iter().skip(offset).take(limit).collect(),
            total,
        })
    }

    async fn fetch_all(&self, plan: &QueryPlan) -> Result<RowPage, StoreError> {
        let rows = self.select(plan);
        let total = rows.len();
        Ok(RowPage { rows, total })
    }

    async fn rank_by_distance(&self, params: &DistanceRankParams) -> Result<RowPage, StoreError> {
        match self.ranking {
            RankingMode::Disabled => {
                return Err(StoreError::Unavailable(
                    "distance ranking function is not installed".to_string(),
                ))
            }
            RankingMode::Delayed(delay) => tokio::time::sleep(delay).await,
            RankingMode::Enabled => {}
        }
        Ok(self.rank(params))
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
