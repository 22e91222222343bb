use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schemas::exam::Question;
use crate::schemas::submission::SubmissionResult;
use crate::session::answers::AnswerMap;
use crate::session::clock::TimeUrgency;
use crate::session::controller::{LoadMode, SessionPhase};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StartSessionRequest {
    #[serde(alias = "examId")]
    #[validate(length(min = 1, message = "exam_id must not be empty"))]
    pub(crate) exam_id: String,
    #[serde(alias = "studentId")]
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub(crate) student_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordAnswerRequest {
    #[serde(default)]
    pub(crate) text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NavigateRequest {
    pub(crate) index: i64,
}

/// Read-only view of a session. Progress figures are derived on every call.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SessionSnapshot {
    pub(crate) session_id: Uuid,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) phase: SessionPhase,
    pub(crate) load_mode: Option<LoadMode>,
    pub(crate) title: Option<String>,
    pub(crate) remaining_seconds: u64,
    pub(crate) remaining_display: String,
    pub(crate) urgency: TimeUrgency,
    pub(crate) current_index: usize,
    pub(crate) current_question: Option<Question>,
    pub(crate) question_count: usize,
    pub(crate) total_marks: u64,
    pub(crate) answered_count: usize,
    pub(crate) unanswered_count: usize,
    pub(crate) progress_percent: f64,
    pub(crate) submission_in_flight: bool,
    pub(crate) answers: AnswerMap,
    pub(crate) result: Option<SubmissionResult>,
    pub(crate) last_error: Option<String>,
}
