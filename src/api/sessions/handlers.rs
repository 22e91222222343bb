use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::session::{
    NavigateRequest, RecordAnswerRequest, SessionSnapshot, StartSessionRequest,
};
use crate::schemas::submission::{SubmitResponse, SubmitTrigger};
use crate::session::controller::{ExamSession, SubmitOutcome};

async fn find_session(state: &AppState, session_id: Uuid) -> Result<ExamSession, ApiError> {
    state
        .sessions()
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
}

pub(super) async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let session = ExamSession::new(
        &payload.exam_id,
        &payload.student_id,
        state.grading().clone(),
        state.settings().exam().default_grading_scale.clone(),
    )?;
    state.sessions().insert(session.clone()).await?;

    if let Err(err) = session.start(state.exams().as_ref()).await {
        state.sessions().remove(session.id()).await;
        return Err(err.into());
    }

    Ok((StatusCode::CREATED, Json(session.snapshot())))
}

pub(super) async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = find_session(&state, session_id).await?;
    Ok(Json(session.snapshot()))
}

pub(super) async fn record_answer(
    State(state): State<AppState>,
    Path((session_id, question_id)): Path<(Uuid, String)>,
    Json(payload): Json<RecordAnswerRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = find_session(&state, session_id).await?;
    session.record_answer(&question_id, payload.text)?;
    Ok(Json(session.snapshot()))
}

pub(super) async fn navigate(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<NavigateRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = find_session(&state, session_id).await?;
    session.navigate(payload.index);
    Ok(Json(session.snapshot()))
}

pub(super) async fn submit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, session_id).await?;

    let response = match session.submit(SubmitTrigger::Manual).await? {
        SubmitOutcome::Submitted(result) => {
            (StatusCode::OK, Json(SubmitResponse { status: "completed", result: Some(result) }))
        }
        SubmitOutcome::AlreadyCompleted(result) => (
            StatusCode::OK,
            Json(SubmitResponse { status: "already_completed", result: Some(result) }),
        ),
        SubmitOutcome::InFlight => {
            (StatusCode::ACCEPTED, Json(SubmitResponse { status: "in_flight", result: None }))
        }
    };

    Ok(response)
}

pub(super) async fn abandon_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.sessions().remove(session_id).await {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::NotFound("Session not found".to_string())),
    }
}
