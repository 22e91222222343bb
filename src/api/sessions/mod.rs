mod handlers;

use axum::{routing::get, routing::post, routing::put, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_session))
        .route("/:session_id", get(handlers::get_session).delete(handlers::abandon_session))
        .route("/:session_id/answers/:question_id", put(handlers::record_answer))
        .route("/:session_id/navigate", post(handlers::navigate))
        .route("/:session_id/submit", post(handlers::submit))
}
