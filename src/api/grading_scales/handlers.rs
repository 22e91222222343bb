use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::grading_scale::{
    EditThresholdRequest, EditThresholdResponse, PreviewRequest, PreviewResponse, ScoreBand,
    ValidateScaleRequest, ValidateScaleResponse,
};
use crate::services::grade_bands::{band_ranges, resolve_band, GradingScale, ScaleEditor};

fn parse_scale(value: &Value) -> Result<GradingScale, ApiError> {
    GradingScale::from_value(value).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(super) async fn validate_scale(
    Json(payload): Json<ValidateScaleRequest>,
) -> Result<Json<ValidateScaleResponse>, ApiError> {
    let scale = parse_scale(&payload.scale)?;

    Ok(Json(ValidateScaleResponse {
        ranges: band_ranges(&scale),
        serialized: scale.to_json(),
        scale,
    }))
}

/// Resolves each score against the given scale, or the configured default.
pub(super) async fn preview_scores(
    State(state): State<AppState>,
    Json(payload): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let scale = match payload.scale.as_ref() {
        Some(Value::Null) | None => state.settings().exam().default_grading_scale.clone(),
        Some(value) => parse_scale(value)?,
    };

    let results = payload
        .scores
        .iter()
        .map(|&score| {
            let band = resolve_band(score, &scale);
            let rank = scale.rank_of(band).unwrap_or(scale.bands().len());
            ScoreBand { score, band: band.to_string(), rank }
        })
        .collect();

    Ok(Json(PreviewResponse { results, ranges: band_ranges(&scale) }))
}

pub(super) async fn edit_threshold(
    Json(payload): Json<EditThresholdRequest>,
) -> Result<(StatusCode, Json<EditThresholdResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut editor = ScaleEditor::new(parse_scale(&payload.scale)?);
    let (status, error) = match editor.set_threshold(&payload.label, payload.threshold) {
        Ok(_) => (StatusCode::OK, None),
        Err(err) => {
            tracing::debug!(label = %payload.label, error = %err, "Rejected grading scale edit");
            (StatusCode::UNPROCESSABLE_ENTITY, Some(err.to_string()))
        }
    };

    let response = EditThresholdResponse {
        accepted: error.is_none(),
        error,
        ranges: editor.ranges(),
        scale: editor.current().clone(),
    };

    Ok((status, Json(response)))
}
