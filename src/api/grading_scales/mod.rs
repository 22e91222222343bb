mod handlers;

use axum::{routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/validate", post(handlers::validate_scale))
        .route("/preview", post(handlers::preview_scores))
        .route("/edit", post(handlers::edit_threshold))
}
