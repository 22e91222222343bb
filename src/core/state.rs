use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Settings;
use crate::services::exam_backend::{ExamSource, GradingService};
use crate::session::controller::RetentionPolicy;
use crate::session::registry::SessionRegistry;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    exams: Arc<dyn ExamSource>,
    grading: Arc<dyn GradingService>,
    sessions: SessionRegistry,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        exams: Arc<dyn ExamSource>,
        grading: Arc<dyn GradingService>,
    ) -> Self {
        let exam = settings.exam();
        let retention = RetentionPolicy {
            completed: Duration::from_secs(exam.completed_retention_seconds),
            expired_grace: Duration::from_secs(exam.expired_grace_seconds),
        };
        let sessions = SessionRegistry::new(exam.max_active_sessions, retention);
        Self { inner: Arc::new(InnerState { settings, exams, grading, sessions }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn exams(&self) -> &Arc<dyn ExamSource> {
        &self.inner.exams
    }

    pub(crate) fn grading(&self) -> &Arc<dyn GradingService> {
        &self.inner.grading
    }

    pub(crate) fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }
}
