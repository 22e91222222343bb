use axum::{
    extract::{Query, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::exam::ExamSummary;
use crate::services::exam_catalog;

use super::queries::AvailableExamsQuery;

async fn fetch_catalog(state: &AppState) -> Result<Vec<ExamSummary>, ApiError> {
    state.exams().list_exams().await.map_err(|err| {
        ApiError::ServiceUnavailable(format!("Exam catalog is unavailable: {err}"))
    })
}

pub(super) async fn list_available(
    State(state): State<AppState>,
    Query(query): Query<AvailableExamsQuery>,
) -> Result<Json<Vec<ExamSummary>>, ApiError> {
    let all = fetch_catalog(&state).await?;
    let excluded = query.excluded_ids();
    let available = exam_catalog::available_for_student(&all, &excluded);

    tracing::debug!(
        total = all.len(),
        excluded = excluded.len(),
        available = available.len(),
        "Listed available exams"
    );

    Ok(Json(available))
}

pub(super) async fn list_ai_corrected(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamSummary>>, ApiError> {
    let all = fetch_catalog(&state).await?;
    Ok(Json(exam_catalog::ai_correction_history(&all)))
}
