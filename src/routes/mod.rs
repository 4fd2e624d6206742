// Route exports
pub mod history;
pub mod search;

use actix_web::web;

pub use search::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(search::configure)
            .configure(history::configure),
    );
}
