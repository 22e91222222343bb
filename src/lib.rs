pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod session;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::exam_backend::HttpExamBackend;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let backend = Arc::new(HttpExamBackend::from_settings(&settings)?);
    tracing::info!(
        base_url = %settings.backend().base_url,
        timeout_seconds = settings.backend().request_timeout_seconds,
        "Exam backend configured"
    );

    let state = AppState::new(settings, backend.clone(), backend);
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        max_active_sessions = state.settings().exam().max_active_sessions,
        "Examino session service listening"
    );

    let (sweeper_shutdown, sweeper) = tasks::scheduler::spawn(state.clone());

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    if sweeper_shutdown.send(true).is_err() {
        tracing::warn!("Session sweeper already stopped");
    }
    if let Err(err) = sweeper.await {
        tracing::error!(error = %err, "Session sweeper join failed");
    }
    state.sessions().abandon_all().await;

    result?;

    Ok(())
}
