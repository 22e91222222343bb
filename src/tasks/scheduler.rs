use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;

/// Starts the registry sweep. Send `true` on the paired sender to stop it.
pub(crate) fn spawn(state: AppState) -> (watch::Sender<bool>, JoinHandle<()>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let period = Duration::from_secs(state.settings().exam().sweep_interval_seconds);
    let handle = tokio::spawn(sweep_sessions_loop(state, period, shutdown_rx));
    (shutdown_tx, handle)
}

async fn sweep_sessions_loop(state: AppState, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let report = state.sessions().sweep().await;
                if report.retried > 0 || report.evicted > 0 {
                    tracing::info!(
                        retried = report.retried,
                        completed = report.completed,
                        evicted = report.evicted,
                        "Swept exam sessions"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::config::Settings;
    use crate::schemas::submission::SubmitTrigger;
    use crate::services::grade_bands::GradingScale;
    use crate::session::controller::{ExamSession, SessionPhase};
    use crate::test_support::{self, sample_exam, FakeExamSource, FakeGradingService};

    #[tokio::test(start_paused = true)]
    async fn sweep_loop_evicts_completed_sessions_until_stopped() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("COMPLETED_SESSION_RETENTION_SECONDS", "60");
        std::env::set_var("SESSION_SWEEP_INTERVAL_SECONDS", "10");
        let settings = Settings::load().expect("settings");
        test_support::set_test_env();

        let grading = Arc::new(FakeGradingService::scoring(75.0));
        let state = AppState::new(
            settings,
            Arc::new(FakeExamSource::with_exam(sample_exam("exam1", 30))),
            grading.clone(),
        );

        let session = ExamSession::new("exam1", "student7", grading, GradingScale::default())
            .expect("session");
        session.start(state.exams().as_ref()).await.expect("start");
        state.sessions().insert(session.clone()).await.expect("insert");
        session.submit(SubmitTrigger::Manual).await.expect("submit");

        let (shutdown_tx, handle) = spawn(state.clone());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(state.sessions().get(session.id()).await.is_some());

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(state.sessions().get(session.id()).await.is_none());
        assert_eq!(session.phase(), SessionPhase::Completed);

        shutdown_tx.send(true).expect("sweeper listening");
        handle.await.expect("sweeper stopped");
    }
}
