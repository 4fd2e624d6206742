//! Radius search around a point.
//!
//! Two [`ProximityStrategy`] implementations: the backend ranking call, and a
//! bounding-box query with client-side haversine, sort and slice.
//! [`GeoProximitySearch`] tries the first and falls back to the second.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::distance::{calculate_bounding_box, distance_from};
use crate::core::error::SearchError;
use crate::core::planner::QueryPlanner;
use crate::core::transform::transform_rows;
use crate::models::{Building, FilterState, GeoPoint, Language, SearchPage};
use crate::services::store::{BuildingStore, DistanceRankParams};

/// Default bound on the backend ranking call
pub const PRIMARY_TIMEOUT: Duration = Duration::from_secs(30);

/// One radius search
#[derive(Debug, Clone, Copy)]
pub struct ProximityRequest<'a> {
    pub center: GeoPoint,
    pub filters: &'a FilterState,
    pub language: Language,
    pub page: u32,
    pub page_size: usize,
}

impl ProximityRequest<'_> {
    pub fn radius_km(&self) -> f64 {
        f64::from(self.filters.radius)
    }

    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size
    }
}

#[async_trait]
pub trait ProximityStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, request: &ProximityRequest<'_>) -> Result<SearchPage, SearchError>;
}

fn optional_list(set: &std::collections::BTreeSet<String>) -> Option<Vec<String>> {
    (!set.is_empty()).then(|| set.iter().cloned().collect())
}

fn sort_by_distance(buildings: &mut [Building]) {
    buildings.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Backend ranking: sorted and paginated before transfer
pub struct RankedStrategy {
    store: Arc<dyn BuildingStore>,
    timeout: Duration,
}

impl RankedStrategy {
    pub fn new(store: Arc<dyn BuildingStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    fn params(request: &ProximityRequest<'_>) -> DistanceRankParams {
        let filters = request.filters;
        DistanceRankParams {
            lat: request.center.lat,
            lng: request.center.lng,
            radius_km: request.radius_km(),
            query: filters.trimmed_query().map(str::to_string),
            architects: optional_list(&filters.architects),
            building_types: optional_list(&filters.building_types),
            prefectures: optional_list(&filters.prefectures),
            areas: optional_list(&filters.areas),
            has_videos: filters.has_videos,
            completion_year: filters.completion_year,
            exclude_residential: filters.exclude_residential,
            language: request.language,
            offset: request.offset(),
            limit: Some(request.page_size),
        }
    }
}

#[async_trait]
impl ProximityStrategy for RankedStrategy {
    fn name(&self) -> &'static str {
        "ranked"
    }

    async fn search(&self, request: &ProximityRequest<'_>) -> Result<SearchPage, SearchError> {
        let mut params = Self::params(request);
        // Photo presence is known only after transform, so the page is cut here
        let require_photos = request.filters.has_photos;
        if require_photos {
            params.offset = 0;
            params.limit = None;
        }

        let page = tokio::time::timeout(self.timeout, self.store.rank_by_distance(&params))
            .await
            .map_err(|_| SearchError::Timeout(self.timeout))??;

        let fetched = page.rows.len();
        let mut buildings = transform_rows(page.rows);
        for building in &mut buildings {
            if building.distance.is_none() {
                building.distance = Some(distance_from(
                    request.center,
                    building.latitude,
                    building.longitude,
                ));
            }
        }

        if !require_photos {
            return Ok(SearchPage {
                buildings,
                total: page.total,
            });
        }

        let skipped = fetched - buildings.len();
        buildings.retain(Building::has_photos);
        let total = buildings.len() + skipped;
        let buildings = buildings
            .into_iter()
            .skip(request.offset())
            .take(request.page_size)
            .collect();

        Ok(SearchPage { buildings, total })
    }
}

/// Bounding-box prefilter, then haversine, sort and slice on the client
pub struct BoundingBoxStrategy {
    store: Arc<dyn BuildingStore>,
    planner: QueryPlanner,
    strict_radius: bool,
}

impl BoundingBoxStrategy {
    /// With `strict_radius` off, box corners outside the circle are kept
    pub fn new(store: Arc<dyn BuildingStore>, planner: QueryPlanner, strict_radius: bool) -> Self {
        Self {
            store,
            planner,
            strict_radius,
        }
    }
}

#[async_trait]
impl ProximityStrategy for BoundingBoxStrategy {
    fn name(&self) -> &'static str {
        "bounding_box"
    }

    async fn search(&self, request: &ProximityRequest<'_>) -> Result<SearchPage, SearchError> {
        let plan = self
            .planner
            .plan(request.filters, request.language)
            .await?;
        if plan.unsatisfiable {
            return Ok(SearchPage::empty());
        }

        let radius = request.radius_km();
        let bbox = calculate_bounding_box(request.center.lat, request.center.lng, radius);
        let rows = self.store.fetch_all(&plan.within(bbox)).await?.rows;

        let fetched = rows.len();
        let mut buildings = transform_rows(rows);
        let skipped = fetched - buildings.len();

        for building in &mut buildings {
            building.distance = Some(distance_from(
                request.center,
                building.latitude,
                building.longitude,
            ));
        }
        if self.strict_radius {
            buildings.retain(|b| b.distance.map(|d| d <= radius).unwrap_or(false));
        }
        let mut buildings = plan.apply_post_transform(buildings);
        sort_by_distance(&mut buildings);

        let total = buildings.len() + skipped;
        let buildings = buildings
            .into_iter()
            .skip(request.offset())
            .take(request.page_size)
            .collect();

        Ok(SearchPage { buildings, total })
    }
}

/// Primary/fallback radius search
pub struct GeoProximitySearch {
    primary: Arc<dyn ProximityStrategy>,
    fallback: Arc<dyn ProximityStrategy>,
    primary_healthy: AtomicBool,
}

impl GeoProximitySearch {
    pub fn new(primary: Arc<dyn ProximityStrategy>, fallback: Arc<dyn ProximityStrategy>) -> Self {
        Self {
            primary,
            fallback,
            primary_healthy: AtomicBool::new(true),
        }
    }

    /// Whether the last primary attempt succeeded
    pub fn primary_healthy(&self) -> bool {
        self.primary_healthy.load(Ordering::Relaxed)
    }

    pub async fn search(&self, request: &ProximityRequest<'_>) -> Result<SearchPage, SearchError> {
        match self.primary.search(request).await {
            Ok(page) => {
                self.primary_healthy.store(true, Ordering::Relaxed);
                Ok(page)
            }
            Err(e) => {
                self.primary_healthy.store(false, Ordering::Relaxed);
                tracing::warn!(
                    "Geo search degraded: {} strategy failed ({}), using {}",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.search(request).await
            }
        }
    }
}
