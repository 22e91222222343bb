use thiserror::Error;

use crate::session::controller::SessionPhase;

/// Exam could not be loaded. Sessions recover from this with the
/// placeholder exam.
#[derive(Debug, Clone, Error)]
pub(crate) enum FetchFailure {
    #[error("exam request failed: {0}")]
    Transport(String),
    #[error("exam service responded with status {0}")]
    Status(u16),
    #[error("exam payload could not be decoded: {0}")]
    Decode(String),
    #[error("exam definition is invalid: {0}")]
    InvalidExam(String),
}

/// Grading service did not accept the submission. Always retryable.
#[derive(Debug, Clone, Error)]
pub(crate) enum SubmitFailure {
    #[error("submission request failed: {0}")]
    Transport(String),
    #[error("grading service responded with status {0}")]
    Status(u16),
    #[error("grading response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("{0} must not be empty")]
    InvalidIdentifier(&'static str),
    #[error("session has already been started")]
    AlreadyStarted,
    #[error("session is still loading")]
    NotReady,
    #[error("session is not accepting answers while {0}")]
    NotAcceptingAnswers(SessionPhase),
    #[error("exam time has expired; the answers can only be submitted")]
    TimeExpired,
    #[error("session was abandoned")]
    Abandoned,
    #[error(transparent)]
    Submit(#[from] SubmitFailure),
}
