use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::time::serialize_offset;
use crate::session::answers::AnswerMap;

/// Body sent to the grading service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionRequest {
    pub(crate) student_id: String,
    pub(crate) exam_id: String,
    pub(crate) answers: AnswerMap,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct GradingResponse {
    pub(crate) score: f64,
    #[serde(default)]
    pub(crate) feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SubmitTrigger {
    Manual,
    Timeout,
}

impl SubmitTrigger {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SubmitTrigger::Manual => "manual",
            SubmitTrigger::Timeout => "timeout",
        }
    }
}

/// Outcome of a completed session. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SubmissionResult {
    pub(crate) student_id: String,
    pub(crate) exam_id: String,
    pub(crate) score: f64,
    pub(crate) band: String,
    pub(crate) feedback: String,
    pub(crate) trigger: SubmitTrigger,
    #[serde(serialize_with = "serialize_offset")]
    pub(crate) submitted_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) result: Option<SubmissionResult>,
}
