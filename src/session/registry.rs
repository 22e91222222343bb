use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::core::metrics;
use crate::schemas::submission::SubmitTrigger;
use crate::session::controller::{ExamSession, Housekeeping, RetentionPolicy, SessionPhase};

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RegistryError {
    #[error("too many active exam sessions (limit {0})")]
    AtCapacity(usize),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub(crate) retried: usize,
    pub(crate) completed: usize,
    pub(crate) evicted: usize,
}

/// Live sessions keyed by id. Completed sessions stay readable for the
/// retention window but do not count against the capacity.
pub(crate) struct SessionRegistry {
    capacity: usize,
    retention: RetentionPolicy,
    sessions: RwLock<HashMap<Uuid, ExamSession>>,
}

impl SessionRegistry {
    pub(crate) fn new(capacity: usize, retention: RetentionPolicy) -> Self {
        Self { capacity, retention, sessions: RwLock::new(HashMap::new()) }
    }

    pub(crate) async fn insert(&self, session: ExamSession) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.write().await;
        if active_count(&sessions) >= self.capacity {
            return Err(RegistryError::AtCapacity(self.capacity));
        }

        sessions.insert(session.id(), session);
        metrics::set_active_sessions(active_count(&sessions));
        Ok(())
    }

    pub(crate) async fn get(&self, id: Uuid) -> Option<ExamSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Removes and abandons the session. Its countdown stops immediately.
    pub(crate) async fn remove(&self, id: Uuid) -> Option<ExamSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.remove(&id)?;
        metrics::set_active_sessions(active_count(&sessions));
        drop(sessions);

        session.abandon();
        Some(session)
    }

    pub(crate) async fn active(&self) -> usize {
        active_count(&*self.sessions.read().await)
    }

    /// Drops completed sessions past retention and expired sessions past the
    /// grace period. Expired sessions still within grace get their automatic
    /// submission retried.
    pub(crate) async fn sweep(&self) -> SweepReport {
        let now = Instant::now();
        let (evicted, retry) = {
            let mut sessions = self.sessions.write().await;
            let mut evicted = Vec::new();
            let mut retry = Vec::new();
            sessions.retain(|_, session| match session.housekeeping(now, &self.retention) {
                Housekeeping::Keep => true,
                Housekeeping::RetrySubmit => {
                    retry.push(session.clone());
                    true
                }
                Housekeeping::Evict => {
                    evicted.push(session.clone());
                    false
                }
            });
            metrics::set_active_sessions(active_count(&sessions));
            (evicted, retry)
        };

        let mut report = SweepReport { evicted: evicted.len(), ..SweepReport::default() };
        for session in evicted {
            if session.phase() != SessionPhase::Completed {
                tracing::warn!(
                    session_id = %session.id(),
                    "Expired session was never graded; dropping it"
                );
                session.abandon();
            }
        }

        for session in retry {
            report.retried += 1;
            match session.submit(SubmitTrigger::Timeout).await {
                Ok(_) => report.completed += 1,
                Err(err) => tracing::warn!(
                    session_id = %session.id(),
                    error = %err,
                    "Retrying the automatic submission failed"
                ),
            }
        }
        if report.completed > 0 {
            metrics::set_active_sessions(self.active().await);
        }

        report
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub(crate) async fn abandon_all(&self) {
        let drained: Vec<ExamSession> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, session)| session).collect()
        };
        metrics::set_active_sessions(0);

        let count = drained.len();
        for session in drained {
            session.abandon();
        }
        if count > 0 {
            tracing::info!(count, "Abandoned open exam sessions");
        }
    }
}

fn active_count(sessions: &HashMap<Uuid, ExamSession>) -> usize {
    sessions
        .values()
        .filter(|session| !matches!(session.phase(), SessionPhase::Completed | SessionPhase::Abandoned))
        .count()
}
