use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use serde_json::json;
use tokio::sync::{Mutex as AsyncMutex, Notify, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::schemas::exam::{ExamDefinition, ExamSummary};
use crate::schemas::submission::{GradingResponse, SubmissionRequest};
use crate::services::exam_backend::{ExamSource, GradingService};
use crate::session::error::{FetchFailure, SubmitFailure};

const TEST_BACKEND_URL: &str = "http://127.0.0.1:9";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) exams: Arc<FakeExamSource>,
    pub(crate) grading: Arc<FakeGradingService>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("EXAMINO_ENV", "test");
    std::env::set_var("EXAMINO_STRICT_CONFIG", "0");
    std::env::set_var("EXAM_BACKEND_URL", TEST_BACKEND_URL);
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("MAX_ACTIVE_SESSIONS");
    std::env::remove_var("COMPLETED_SESSION_RETENTION_SECONDS");
    std::env::remove_var("EXPIRED_SESSION_GRACE_SECONDS");
    std::env::remove_var("SESSION_SWEEP_INTERVAL_SECONDS");
    std::env::remove_var("DEFAULT_GRADING_SCALE");
    std::env::remove_var("API_V1_STR");
}

pub(crate) async fn setup_test_context() -> TestContext {
    setup_test_context_with(FakeExamSource::with_exam(sample_exam("exam1", 30)), FakeGradingService::scoring(85.0))
        .await
}

pub(crate) async fn setup_test_context_with(
    exams: FakeExamSource,
    grading: FakeGradingService,
) -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let exams = Arc::new(exams);
    let grading = Arc::new(grading);
    let state = AppState::new(settings, exams.clone(), grading.clone());
    let app = api::router::router(state.clone());

    TestContext { state, app, exams, grading, _guard: guard }
}

pub(crate) fn sample_exam(exam_id: &str, duration_minutes: u32) -> ExamDefinition {
    serde_json::from_value(json!({
        "examId": exam_id,
        "title": "Mathematics",
        "duration": duration_minutes,
        "questions": [
            {"questionId": "q1", "questionText": "What is 2 + 2?", "type": "MCQ", "marks": 5},
            {"questionId": "q2", "questionText": "Name a prime number.", "type": "MCQ", "marks": 5},
            {"questionId": "q3", "questionText": "Explain induction.", "type": "TEXT", "marks": 10}
        ]
    }))
    .expect("sample exam")
}

/// Exam source backed by memory. `None` makes every fetch fail.
pub(crate) struct FakeExamSource {
    exam: Option<ExamDefinition>,
    summaries: Option<Vec<ExamSummary>>,
    fetches: AtomicUsize,
}

impl FakeExamSource {
    pub(crate) fn with_exam(exam: ExamDefinition) -> Self {
        Self { exam: Some(exam), summaries: Some(Vec::new()), fetches: AtomicUsize::new(0) }
    }

    pub(crate) fn failing() -> Self {
        Self { exam: None, summaries: None, fetches: AtomicUsize::new(0) }
    }

    pub(crate) fn with_summaries(mut self, summaries: Vec<ExamSummary>) -> Self {
        self.summaries = Some(summaries);
        self
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExamSource for FakeExamSource {
    async fn fetch_exam(&self, exam_id: &str) -> Result<ExamDefinition, FetchFailure> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.exam {
            Some(exam) => {
                let mut exam = exam.clone();
                exam.id = exam_id.to_string();
                Ok(exam)
            }
            None => Err(FetchFailure::Transport("connection refused".to_string())),
        }
    }

    async fn list_exams(&self) -> Result<Vec<ExamSummary>, FetchFailure> {
        self.summaries.clone().ok_or(FetchFailure::Status(503))
    }
}

/// Grading service that records every request. Can be told to fail the
/// next calls or to hold responses until released.
pub(crate) struct FakeGradingService {
    score: f64,
    failures_left: AtomicUsize,
    hold: Option<Arc<Notify>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<SubmissionRequest>>,
}

impl FakeGradingService {
    pub(crate) fn scoring(score: f64) -> Self {
        Self {
            score,
            failures_left: AtomicUsize::new(0),
            hold: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_times(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Responses wait until `release.notify_one()` is called.
    pub(crate) fn held_by(mut self, release: Arc<Notify>) -> Self {
        self.hold = Some(release);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<SubmissionRequest> {
        self.requests.lock().expect("requests lock").last().cloned()
    }
}

#[async_trait]
impl GradingService for FakeGradingService {
    async fn submit_exam(&self, request: &SubmissionRequest) -> Result<GradingResponse, SubmitFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request.clone());

        if let Some(release) = &self.hold {
            release.notified().await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SubmitFailure::Status(503));
        }

        Ok(GradingResponse { score: self.score, feedback: "Well done".to_string() })
    }
}

pub(crate) fn json_request(method: Method, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
