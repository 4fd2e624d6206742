use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use archi_search::config::{Settings, StoreKind};
use archi_search::core::transform::transform_rows;
use archi_search::core::SearchEngine;
use archi_search::models::BuildingRow;
use archi_search::routes::{self, AppState};
use archi_search::services::{
    self, BuildingStore, CacheManager, HistoryRepository, HistoryStore, MemoryStore, RestStore, RestTables,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error(message: String) -> std::io::Error {
    error!("{}", message);
    std::io::Error::new(std::io::ErrorKind::Other, message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    // Initialize logging; RUST_LOG wins over the configured level
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting archi-search...");

    // Snapshot rows: data for the memory store and the local fallback collection
    let snapshot: Option<Vec<BuildingRow>> = match &settings.store.snapshot_path {
        Some(path) => Some(services::load_rows(path).map_err(|e| startup_error(e.to_string()))?),
        None => None,
    };

    let store: Arc<dyn BuildingStore> = match settings.store.kind {
        StoreKind::Rest => {
            let url = settings
                .store
                .url
                .clone()
                .ok_or_else(|| startup_error("store.url is required for the rest store".to_string()))?;
            let api_key = settings.store.api_key.clone().unwrap_or_default();
            let store = RestStore::new(
                url,
                api_key,
                Duration::from_secs(settings.store.timeout_secs),
                RestTables::default(),
            )
            .map_err(|e| startup_error(format!("Failed to build REST client: {}", e)))?;
            info!("REST store initialized");
            Arc::new(store)
        }
        StoreKind::Memory => {
            let rows = snapshot
                .clone()
                .ok_or_else(|| startup_error("store.snapshot_path is required for the memory store".to_string()))?;
            info!("Memory store initialized");
            Arc::new(MemoryStore::new(rows))
        }
    };

    // Initialize cache manager (Redis is optional)
    let cache_ttl = settings.cache.ttl_secs;
    let l1_cache_size = settings.cache.l1_cache_size;

    let cache = match CacheManager::new(settings.cache.redis_url.as_deref(), l1_cache_size, cache_ttl).await {
        Ok(c) => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            c
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), using in-process cache only", e);
            CacheManager::in_memory(l1_cache_size, cache_ttl)
        }
    };

    // History database (optional)
    let history: Option<Arc<dyn HistoryStore>> = match &settings.database.url {
        Some(url) => {
            let repo = HistoryRepository::from_settings(
                url,
                settings.database.max_connections,
                settings.database.min_connections,
            )
            .await
            .map_err(|e| startup_error(format!("Failed to connect to history database: {}", e)))?;
            info!("History repository initialized");
            Some(Arc::new(repo) as Arc<dyn HistoryStore>)
        }
        None => {
            info!("No history database configured, history endpoints disabled");
            None
        }
    };

    let options = settings.search.engine_options();
    let engine = Arc::new(SearchEngine::new(store, options, Some(Arc::new(cache))));

    info!(
        "Search engine initialized (page size: {}, primary timeout: {:?}, strict radius: {})",
        options.page_size, options.primary_timeout, options.strict_radius
    );

    let app_state = AppState {
        engine,
        local: snapshot.map(|rows| Arc::new(transform_rows(rows))),
        history,
        default_radius_km: settings.search.default_radius_km,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
