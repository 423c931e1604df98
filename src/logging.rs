use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RALLY_LOG";

/// Install the stderr subscriber. Filter comes from `RALLY_LOG`, then
/// `RUST_LOG`, then `info`. Safe to call more than once.
pub fn init_logging() {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
