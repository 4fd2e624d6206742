use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::architects::ArchitectNameResolver;
use crate::core::error::SearchError;
use crate::core::geo::{BoundingBoxStrategy, GeoProximitySearch, ProximityRequest, RankedStrategy, PRIMARY_TIMEOUT};
use crate::core::planner::QueryPlanner;
use crate::core::transform::transform_rows;
use crate::models::{BuildingArchitects, FilterState, Language, SearchPage};
use crate::services::cache::{CacheKey, CacheManager, CacheStats};
use crate::services::store::BuildingStore;

/// Engine tuning
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub page_size: usize,
    pub primary_timeout: Duration,
    /// Drop bounding-box corner hits outside the true radius on the fallback path
    pub strict_radius: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            primary_timeout: PRIMARY_TIMEOUT,
            strict_radius: true,
        }
    }
}

/// Search orchestrator
///
/// # Flow
/// 1. Exact-key cache lookup
/// 2. Location set: radius search (ranked, else bounding box)
/// 3. Otherwise: plan, fetch one page, transform, has-photos
/// 4. Cache fill
pub struct SearchEngine {
    store: Arc<dyn BuildingStore>,
    planner: QueryPlanner,
    geo: GeoProximitySearch,
    cache: Option<Arc<CacheManager>>,
    options: EngineOptions,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn BuildingStore>, options: EngineOptions, cache: Option<Arc<CacheManager>>) -> Self {
        let planner = QueryPlanner::new(ArchitectNameResolver::new(Arc::clone(&store)));
        let geo = GeoProximitySearch::new(
            Arc::new(RankedStrategy::new(Arc::clone(&store), options.primary_timeout)),
            Arc::new(BoundingBoxStrategy::new(
                Arc::clone(&store),
                planner.clone(),
                options.strict_radius,
            )),
        );

        Self {
            store,
            planner,
            geo,
            cache,
            options,
        }
    }

    pub fn page_size(&self) -> usize {
        self.options.page_size
    }

    pub fn primary_geo_healthy(&self) -> bool {
        self.geo.primary_healthy()
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    pub async fn health_check(&self) -> bool {
        self.store.health_check().await.unwrap_or(false)
    }

    /// One page (1-based) with the configured page size
    pub async fn search(&self, filters: &FilterState, page: u32, language: Language) -> Result<SearchPage, SearchError> {
        self.search_with_size(filters, page, self.options.page_size, language)
            .await
    }

    pub async fn search_with_size(
        &self,
        filters: &FilterState,
        page: u32,
        page_size: usize,
        language: Language,
    ) -> Result<SearchPage, SearchError> {
        let page = page.max(1);
        let key = CacheKey::search(filters, page, page_size, true, language);

        if let Some(cache) = &self.cache {
            if let Ok(hit) = cache.get::<SearchPage>(&key).await {
                tracing::debug!("Serving page {} from cache", page);
                return Ok(hit);
            }
        }

        let result = match filters.current_location {
            Some(center) => {
                let request = ProximityRequest {
                    center,
                    filters,
                    language,
                    page,
                    page_size,
                };
                self.geo.search(&request).await?
            }
            None => self.filtered_page(filters, page, page_size, language).await?,
        };

        tracing::info!(
            "Search returned {} buildings (total {}) for page {}",
            result.buildings.len(),
            result.total,
            page
        );

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &result).await {
                tracing::warn!("Failed to cache search page: {}", e);
            }
        }

        Ok(result)
    }

    async fn filtered_page(
        &self,
        filters: &FilterState,
        page: u32,
        page_size: usize,
        language: Language,
    ) -> Result<SearchPage, SearchError> {
        let plan = self.planner.plan(filters, language).await?;
        if plan.unsatisfiable {
            return Ok(SearchPage::empty());
        }

        let offset = (page as usize - 1) * page_size;
        let rows = self.store.fetch_page(&plan, offset, page_size).await?;
        let buildings = plan.apply_post_transform(transform_rows(rows.rows));

        Ok(SearchPage {
            buildings,
            total: rows.total,
        })
    }

    /// Warm the cache for another page without touching anything displayed
    pub fn prefetch(self: &Arc<Self>, filters: FilterState, page: u32, page_size: usize, language: Language) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            match engine
                .search_with_size(&filters, page, page_size, language)
                .await
            {
                Ok(_) => tracing::debug!("Prefetched page {}", page),
                Err(e) => tracing::debug!("Prefetch of page {} failed: {}", page, e),
            }
        })
    }

    /// Deduplicated architect list for the detail view
    pub async fn architects_for_building(
        &self,
        building_id: i64,
        language: Language,
    ) -> Result<BuildingArchitects, SearchError> {
        let key = CacheKey::architects(building_id, language);
        if let Some(cache) = &self.cache {
            if let Ok(hit) = cache.get::<BuildingArchitects>(&key).await {
                return Ok(hit);
            }
        }

        let architects = self
            .planner
            .resolver()
            .architects_for_building(building_id, language)
            .await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &architects).await {
                tracing::warn!("Failed to cache architects: {}", e);
            }
        }

        Ok(architects)
    }
}
