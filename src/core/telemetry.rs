use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// HTTP client internals are noisy at `debug`; keep them at `warn` unless
/// `RUST_LOG` says otherwise.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn"];

pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&settings.telemetry().log_level)));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let installed = if settings.telemetry().json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| anyhow::anyhow!(err.to_string()))?;

    tracing::debug!(
        level = %settings.telemetry().log_level,
        json = settings.telemetry().json,
        "Tracing initialised"
    );

    Ok(())
}

fn filter_directives(level: &str) -> String {
    std::iter::once(level).chain(QUIET_DEPENDENCIES.iter().copied()).collect::<Vec<_>>().join(",")
}
