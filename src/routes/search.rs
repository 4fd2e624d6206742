use actix_web::{web, HttpRequest, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::filters::search_local;
use crate::core::pagination::{page_range, total_pages};
use crate::core::SearchEngine;
use crate::models::query_params::{self, FilterQuery};
use crate::models::{
    Building, ErrorResponse, FilterState, HealthResponse, Language, LanguageQuery, SearchOptions, SearchResponse,
};
use crate::services::HistoryStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    /// In-memory collection served when the backend query fails
    pub local: Option<Arc<Vec<Building>>>,
    pub history: Option<Arc<dyn HistoryStore>>,
    /// Radius applied when the query string carries none
    pub default_radius_km: u32,
}

/// Configure search and building routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/buildings/search", web::get().to(search_buildings))
        .route("/buildings/{id}/architects", web::get().to(building_architects));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.engine.health_check().await;
    let history_healthy = match &state.history {
        Some(history) => history.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if store_healthy && history_healthy && state.engine.primary_geo_healthy() {
        "healthy"
    } else {
        "degraded"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        cache: state.engine.cache_stats(),
    })
}

/// Free-text query to record for a search, only on its first page
fn history_query(filters: &FilterState, page: u32) -> Option<&str> {
    if page == 1 {
        filters.trimmed_query()
    } else {
        None
    }
}

/// Search buildings
///
/// GET /api/v1/buildings/search?q=...&architects=a,b&page=2&pageSize=20&lang=en
///
/// Filter keys follow the shareable URL encoding; `lang`, `pageSize`,
/// `sessionId` and `includeResidential` ride along.
async fn search_buildings(
    state: web::Data<AppState>,
    options: web::Query<SearchOptions>,
    req: HttpRequest,
) -> impl Responder {
    if let Err(errors) = options.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let pairs = query_params::decode_raw(req.query_string());
    let FilterQuery { mut filters, page } = query_params::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if !pairs.iter().any(|(k, _)| k == "radius") {
        filters.radius = state.default_radius_km;
    }
    if options.include_residential {
        filters.exclude_residential = false;
    }
    let language = Language::parse(options.lang.as_deref().unwrap_or_default());
    let page_size = options.page_size;

    let result = match state
        .engine
        .search_with_size(&filters, page, page_size, language)
        .await
    {
        Ok(result) => result,
        Err(e) => match &state.local {
            Some(local) => {
                tracing::warn!("Backend search failed, serving local collection: {}", e);
                search_local(local, &filters, language, page, page_size)
            }
            None => {
                tracing::error!("Search failed: {}", e);
                return HttpResponse::BadGateway().json(ErrorResponse {
                    error: "Search failed".to_string(),
                    message: e.to_string(),
                    status_code: 502,
                });
            }
        },
    };

    let pages = total_pages(result.total, page_size);
    if page < pages {
        state
            .engine
            .prefetch(filters.clone(), page + 1, page_size, language);
    }

    if let (Some(session_id), Some(history), Some(query)) =
        (&options.session_id, &state.history, history_query(&filters, page))
    {
        if let Err(e) = history.record_text(session_id, query).await {
            tracing::warn!("Failed to record search history for {}: {}", session_id, e);
        }
    }

    HttpResponse::Ok().json(SearchResponse {
        buildings: result.buildings,
        total: result.total,
        page,
        total_pages: pages,
        pagination: page_range(page, pages),
    })
}

/// Individual architects credited on a building
///
/// GET /api/v1/buildings/{id}/architects?lang=ja
async fn building_architects(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<LanguageQuery>,
) -> impl Responder {
    let building_id = path.into_inner();
    let language = Language::parse(query.lang.as_deref().unwrap_or_default());

    match state
        .engine
        .architects_for_building(building_id, language)
        .await
    {
        Ok(architects) => HttpResponse::Ok().json(architects),
        Err(e) => {
            tracing::error!("Failed to resolve architects for building {}: {}", building_id, e);
            HttpResponse::BadGateway().json(ErrorResponse {
                error: "Failed to resolve architects".to_string(),
                message: e.to_string(),
                status_code: 502,
            })
        }
    }
}
