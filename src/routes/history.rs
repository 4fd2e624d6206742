use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::SearchHistory;
use crate::models::{ErrorResponse, HistoryResponse, RecordHistoryRequest};
use crate::routes::search::AppState;
use crate::services::{HistoryError, HistoryStore};

const POPULAR_LIMIT: usize = 5;

/// Configure history routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/history/{session}", web::get().to(get_history))
        .route("/history/{session}", web::post().to(record_history));
}

fn unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ErrorResponse {
        error: "History unavailable".to_string(),
        message: "No history database is configured".to_string(),
        status_code: 503,
    })
}

fn respond(session_id: String, history: SearchHistory) -> HttpResponse {
    let popular = history
        .popular(POPULAR_LIMIT)
        .into_iter()
        .cloned()
        .collect();
    HttpResponse::Ok().json(HistoryResponse {
        session_id,
        entries: history.into_entries(),
        popular,
    })
}

fn repository(state: &AppState) -> Option<&dyn HistoryStore> {
    state.history.as_deref()
}

/// GET /api/v1/history/{session}
async fn get_history(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let Some(history) = repository(&state) else {
        return unavailable();
    };
    let session_id = path.into_inner();

    match history.load(&session_id).await {
        Ok(entries) => respond(session_id, entries),
        Err(e) => {
            tracing::error!("Failed to load history for {}: {}", session_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load history".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// POST /api/v1/history/{session}
///
/// Request body:
/// ```json
/// {
///   "query": "安藤忠雄",
///   "kind": "architect",
///   "filters": { "architects": ["安藤忠雄"] }
/// }
/// ```
async fn record_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<RecordHistoryRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }
    let Some(history) = repository(&state) else {
        return unavailable();
    };
    let session_id = path.into_inner();

    match history.record(&session_id, req.into_inner()).await {
        Ok(entries) => respond(session_id, entries),
        Err(HistoryError::InvalidInput(message)) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid history entry".to_string(),
            message,
            status_code: 400,
        }),
        Err(e) => {
            tracing::error!("Failed to record history for {}: {}", session_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to record history".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
