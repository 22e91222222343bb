//! Lifecycle of a single exam attempt.
//!
//! `Loading -> InProgress -> Submitting -> Completed`, with `Abandoned` as the
//! exit for sessions the student walks away from. A failed submission moves
//! the session back to `InProgress` so it can be retried.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::core::{metrics, time};
use crate::schemas::exam::ExamDefinition;
use crate::schemas::session::SessionSnapshot;
use crate::schemas::submission::{SubmissionRequest, SubmissionResult, SubmitTrigger};
use crate::services::exam_backend::{ExamSource, GradingService};
use crate::services::grade_bands::{clamp_score, resolve_band, GradingScale};
use crate::services::placeholder_exam::placeholder_exam;
use crate::session::answers::AnswerMap;
use crate::session::clock::SessionClock;
use crate::session::error::{FetchFailure, SessionError, SubmitFailure};
use crate::session::guard::SubmissionGuard;

pub(crate) const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SessionPhase {
    Loading,
    InProgress,
    Submitting,
    Completed,
    Abandoned,
}

impl SessionPhase {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Loading => "loading",
            SessionPhase::InProgress => "in_progress",
            SessionPhase::Submitting => "submitting",
            SessionPhase::Completed => "completed",
            SessionPhase::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the session runs on the real exam or on the built-in placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LoadMode {
    Fetched,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Running(u64),
    /// Submission in flight; the clock holds its value.
    Paused,
    /// This tick brought the clock to zero.
    Expired,
    Stopped,
}

/// What the registry sweep should do with a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Housekeeping {
    Keep,
    /// The clock ran out but the automatic submission never landed.
    RetrySubmit,
    Evict,
}

/// How long finished sessions stay in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetentionPolicy {
    /// Completed sessions stay readable this long after grading.
    pub(crate) completed: Duration,
    /// Expired sessions whose submission keeps failing are dropped after this.
    pub(crate) expired_grace: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SubmitOutcome {
    Submitted(SubmissionResult),
    InFlight,
    AlreadyCompleted(SubmissionResult),
}

/// Cheap to clone; all clones drive the same attempt.
#[derive(Clone)]
pub(crate) struct ExamSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    exam_id: String,
    student_id: String,
    grading: Arc<dyn GradingService>,
    default_scale: GradingScale,
    guard: SubmissionGuard,
    state: Mutex<SessionState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

struct SessionState {
    phase: SessionPhase,
    fetch_started: bool,
    exam: Option<ExamDefinition>,
    load_mode: Option<LoadMode>,
    scale: GradingScale,
    clock: SessionClock,
    answers: AnswerMap,
    cursor: usize,
    result: Option<SubmissionResult>,
    last_error: Option<String>,
    expired_at: Option<Instant>,
    completed_at: Option<Instant>,
}

impl SessionState {
    fn question_count(&self) -> usize {
        self.exam.as_ref().map_or(0, |exam| exam.question_count())
    }

    fn answered_count(&self) -> usize {
        self.exam.as_ref().map_or(0, |exam| self.answers.answered_count(&exam.questions))
    }

    fn progress_percent(&self) -> f64 {
        match self.question_count() {
            0 => 0.0,
            count => 100.0 * (self.cursor + 1) as f64 / count as f64,
        }
    }
}

impl ExamSession {
    pub(crate) fn new(
        exam_id: &str,
        student_id: &str,
        grading: Arc<dyn GradingService>,
        default_scale: GradingScale,
    ) -> Result<Self, SessionError> {
        if exam_id.trim().is_empty() {
            return Err(SessionError::InvalidIdentifier("exam_id"));
        }
        if student_id.trim().is_empty() {
            return Err(SessionError::InvalidIdentifier("student_id"));
        }

        let state = SessionState {
            phase: SessionPhase::Loading,
            fetch_started: false,
            exam: None,
            load_mode: None,
            scale: default_scale.clone(),
            clock: SessionClock::default(),
            answers: AnswerMap::default(),
            cursor: 0,
            result: None,
            last_error: None,
            expired_at: None,
            completed_at: None,
        };

        Ok(Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                exam_id: exam_id.trim().to_string(),
                student_id: student_id.trim().to_string(),
                grading,
                default_scale,
                guard: SubmissionGuard::default(),
                state: Mutex::new(state),
                ticker: Mutex::new(None),
            }),
        })
    }

    pub(crate) fn id(&self) -> Uuid {
        self.inner.id
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    pub(crate) fn submission_in_flight(&self) -> bool {
        self.inner.guard.is_in_flight()
    }

    /// Loads the exam and starts the countdown. A failed or invalid fetch
    /// never blocks the student: the placeholder exam is used instead.
    pub(crate) async fn start(&self, exams: &dyn ExamSource) -> Result<LoadMode, SessionError> {
        {
            let mut state = self.state();
            if state.phase == SessionPhase::Abandoned {
                return Err(SessionError::Abandoned);
            }
            if state.fetch_started {
                return Err(SessionError::AlreadyStarted);
            }
            state.fetch_started = true;
        }

        let fetched = exams.fetch_exam(&self.inner.exam_id).await.and_then(|exam| {
            exam.check().map_err(FetchFailure::InvalidExam)?;
            Ok(exam)
        });

        let (exam, mode) = match fetched {
            Ok(exam) => (exam, LoadMode::Fetched),
            Err(err) => {
                tracing::warn!(
                    session_id = %self.inner.id,
                    exam_id = %self.inner.exam_id,
                    error = %err,
                    "Exam fetch failed; continuing with placeholder exam"
                );
                (placeholder_exam(&self.inner.exam_id), LoadMode::Degraded)
            }
        };

        let scale = match exam.embedded_grading_scale() {
            Some(Ok(scale)) => scale,
            Some(Err(err)) => {
                tracing::warn!(
                    session_id = %self.inner.id,
                    exam_id = %self.inner.exam_id,
                    error = %err,
                    "Exam carries an invalid grading scale; using the default scale"
                );
                self.inner.default_scale.clone()
            }
            None => self.inner.default_scale.clone(),
        };

        let duration_minutes = exam.duration_minutes;
        {
            let mut state = self.state();
            if state.phase == SessionPhase::Abandoned {
                return Err(SessionError::Abandoned);
            }
            state.clock = SessionClock::from_minutes(duration_minutes);
            state.exam = Some(exam);
            state.load_mode = Some(mode);
            state.scale = scale;
            state.cursor = 0;
            state.phase = SessionPhase::InProgress;
        }

        metrics::record_session_started(mode == LoadMode::Degraded);
        self.spawn_ticker();

        tracing::info!(
            session_id = %self.inner.id,
            exam_id = %self.inner.exam_id,
            student_id = %self.inner.student_id,
            duration_minutes,
            load_mode = ?mode,
            "Exam session started"
        );

        Ok(mode)
    }

    /// One second of exam time. Does nothing outside `InProgress`; returns
    /// `Expired` exactly once, on the tick that reaches zero.
    pub(crate) fn tick(&self) -> TickOutcome {
        let mut state = self.state();
        match state.phase {
            SessionPhase::InProgress => {}
            SessionPhase::Submitting => return TickOutcome::Paused,
            _ => return TickOutcome::Stopped,
        }

        if state.clock.is_expired() {
            return TickOutcome::Stopped;
        }

        match state.clock.tick() {
            0 => {
                state.expired_at = Some(Instant::now());
                TickOutcome::Expired
            }
            remaining => TickOutcome::Running(remaining),
        }
    }

    pub(crate) fn record_answer(&self, question_id: &str, text: String) -> Result<(), SessionError> {
        let mut state = self.state();
        match state.phase {
            SessionPhase::InProgress if state.clock.is_expired() => Err(SessionError::TimeExpired),
            SessionPhase::InProgress => {
                state.answers.record(question_id, text);
                Ok(())
            }
            SessionPhase::Loading => Err(SessionError::NotReady),
            SessionPhase::Abandoned => Err(SessionError::Abandoned),
            phase => Err(SessionError::NotAcceptingAnswers(phase)),
        }
    }

    /// Moves the cursor to `index` clamped into the question range.
    pub(crate) fn navigate(&self, index: i64) -> usize {
        let mut state = self.state();
        let count = state.question_count();
        if count == 0 {
            return state.cursor;
        }

        let last = (count - 1) as i64;
        state.cursor = index.clamp(0, last) as usize;
        state.cursor
    }

    /// Submits the captured answers unless a submission is already in flight.
    /// On failure the answers are kept and the session can be submitted again.
    pub(crate) async fn submit(&self, trigger: SubmitTrigger) -> Result<SubmitOutcome, SessionError> {
        let Some(_ticket) = self.inner.guard.try_acquire() else {
            tracing::debug!(
                session_id = %self.inner.id,
                trigger = trigger.as_str(),
                "Submission already in flight; ignoring"
            );
            return Ok(SubmitOutcome::InFlight);
        };

        let request = {
            let mut state = self.state();
            match state.phase {
                SessionPhase::InProgress => {}
                SessionPhase::Completed => {
                    return match state.result.clone() {
                        Some(result) => Ok(SubmitOutcome::AlreadyCompleted(result)),
                        None => Err(SessionError::NotReady),
                    };
                }
                SessionPhase::Submitting => return Ok(SubmitOutcome::InFlight),
                SessionPhase::Loading => return Err(SessionError::NotReady),
                SessionPhase::Abandoned => return Err(SessionError::Abandoned),
            }

            state.phase = SessionPhase::Submitting;
            state.last_error = None;
            SubmissionRequest {
                student_id: self.inner.student_id.clone(),
                exam_id: self.inner.exam_id.clone(),
                answers: state.answers.clone(),
            }
        };

        tracing::info!(
            session_id = %self.inner.id,
            exam_id = %self.inner.exam_id,
            trigger = trigger.as_str(),
            answers = request.answers.len(),
            "Submitting exam"
        );

        let response = self.inner.grading.submit_exam(&request).await.and_then(|response| {
            if response.score.is_finite() {
                Ok(response)
            } else {
                Err(SubmitFailure::Decode("score is not a finite number".to_string()))
            }
        });

        let mut state = self.state();
        let response = match response {
            Ok(response) => response,
            Err(failure) => {
                metrics::record_submission(trigger.as_str(), "failed");
                if state.phase == SessionPhase::Submitting {
                    state.phase = SessionPhase::InProgress;
                }
                state.last_error = Some(failure.to_string());
                tracing::warn!(
                    session_id = %self.inner.id,
                    trigger = trigger.as_str(),
                    error = %failure,
                    "Submission failed; answers kept for retry"
                );
                return Err(SessionError::Submit(failure));
            }
        };

        if state.phase == SessionPhase::Abandoned {
            return Err(SessionError::Abandoned);
        }

        let score = clamp_score(response.score);
        if score != response.score {
            tracing::warn!(
                session_id = %self.inner.id,
                reported = response.score,
                clamped = score,
                "Grading service returned a score outside 0..=100"
            );
        }

        let result = SubmissionResult {
            student_id: self.inner.student_id.clone(),
            exam_id: self.inner.exam_id.clone(),
            score,
            band: resolve_band(score, &state.scale).to_string(),
            feedback: response.feedback,
            trigger,
            submitted_at: time::now_utc(),
        };

        state.phase = SessionPhase::Completed;
        state.completed_at = Some(Instant::now());
        state.answers = AnswerMap::default();
        state.result = Some(result.clone());
        drop(state);

        self.cancel_ticker();
        metrics::record_submission(trigger.as_str(), "completed");
        tracing::info!(
            session_id = %self.inner.id,
            exam_id = %self.inner.exam_id,
            score = result.score,
            band = %result.band,
            "Exam submission completed"
        );

        Ok(SubmitOutcome::Submitted(result))
    }

    /// Ends the attempt without submitting. The countdown is released so it
    /// can never fire against this session again.
    pub(crate) fn abandon(&self) {
        {
            let mut state = self.state();
            if state.phase != SessionPhase::Completed {
                state.phase = SessionPhase::Abandoned;
            }
            state.answers = AnswerMap::default();
        }
        self.cancel_ticker();
        tracing::info!(session_id = %self.inner.id, "Exam session abandoned");
    }

    pub(crate) fn housekeeping(&self, now: Instant, policy: &RetentionPolicy) -> Housekeeping {
        if self.inner.guard.is_in_flight() {
            return Housekeeping::Keep;
        }

        let state = self.state();
        let elapsed_since = |at: Option<Instant>| at.map(|at| now.saturating_duration_since(at));
        match state.phase {
            SessionPhase::Abandoned => Housekeeping::Evict,
            SessionPhase::Completed => match elapsed_since(state.completed_at) {
                Some(elapsed) if elapsed >= policy.completed => Housekeeping::Evict,
                _ => Housekeeping::Keep,
            },
            SessionPhase::InProgress => match elapsed_since(state.expired_at) {
                Some(elapsed) if elapsed >= policy.expired_grace => Housekeeping::Evict,
                Some(_) => Housekeeping::RetrySubmit,
                None => Housekeeping::Keep,
            },
            SessionPhase::Loading | SessionPhase::Submitting => Housekeeping::Keep,
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        let current_question = state
            .exam
            .as_ref()
            .and_then(|exam| exam.questions.get(state.cursor))
            .cloned();
        let question_count = state.question_count();
        let answered_count = state.answered_count();

        SessionSnapshot {
            session_id: self.inner.id,
            exam_id: self.inner.exam_id.clone(),
            student_id: self.inner.student_id.clone(),
            phase: state.phase,
            load_mode: state.load_mode,
            title: state.exam.as_ref().map(|exam| exam.title.clone()),
            remaining_seconds: state.clock.remaining_seconds(),
            remaining_display: time::format_remaining(state.clock.remaining_seconds()),
            urgency: state.clock.urgency(),
            current_index: state.cursor,
            current_question,
            question_count,
            total_marks: state.exam.as_ref().map_or(0, |exam| exam.total_marks()),
            answered_count,
            unanswered_count: question_count - answered_count,
            progress_percent: state.progress_percent(),
            submission_in_flight: self.inner.guard.is_in_flight(),
            answers: state.answers.clone(),
            result: state.result.clone(),
            last_error: state.last_error.clone(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_ticker(&self) {
        let handle = tokio::spawn(run_ticker(Arc::downgrade(&self.inner)));
        let previous = self.inner.ticker.lock().unwrap_or_else(PoisonError::into_inner).replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn cancel_ticker(&self) {
        let handle = self.inner.ticker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn ticker_running(&self) -> bool {
        self.inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let handle = self.ticker.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

/// Ticks are sequential: the next sleep starts only after the previous tick
/// (and any automatic submission) has finished. Holds the session weakly so a
/// dropped session is never kept alive by its own countdown.
async fn run_ticker(session: Weak<SessionInner>) {
    loop {
        tokio::time::sleep(TICK_PERIOD).await;

        let Some(inner) = session.upgrade() else {
            break;
        };
        let session = ExamSession { inner };

        match session.tick() {
            TickOutcome::Running(remaining) if remaining % 60 == 0 => {
                tracing::trace!(session_id = %session.id(), remaining, "Exam clock");
            }
            TickOutcome::Running(_) | TickOutcome::Paused => {}
            TickOutcome::Expired => {
                tracing::info!(session_id = %session.id(), "Exam time is up; submitting automatically");
                if let Err(err) = session.submit(SubmitTrigger::Timeout).await {
                    tracing::warn!(
                        session_id = %session.id(),
                        error = %err,
                        "Automatic submission failed; session stays open for a manual retry"
                    );
                }
                break;
            }
            TickOutcome::Stopped => break,
        }
    }
}
