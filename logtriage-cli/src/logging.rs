//! Diagnostics for the `logtriage` binary
//!
//! Command reports own stdout, so every tracing event goes to stderr. The
//! level comes from `--log-level`, then `[general].log_level`; `RUST_LOG`
//! beats both.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logtriage_core::config::GeneralConfig;

/// Installs the stderr subscriber for one CLI run.
///
/// `log_format = "json"` emits one JSON object per event for piping into a
/// collector; `"pretty"` prints short single-line events without targets,
/// since a CLI invocation is one short-lived process.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter = env_filter(&config.log_level);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.log_format.as_str() {
        "json" => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        "pretty" => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        other => {
            return Err(anyhow::anyhow!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            ));
        }
    };

    installed.map_err(|e| anyhow::anyhow!("failed to install logtriage subscriber: {e}"))
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
