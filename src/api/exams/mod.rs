mod handlers;
mod queries;

use axum::{routing::get, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_available))
        .route("/ai-corrected", get(handlers::list_ai_corrected))
}
