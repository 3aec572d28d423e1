use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Installs the global log subscriber; the level comes from `RUST_LOG`, `info` by default.
///
/// Timestamps are left out, CloudWatch stamps every line itself.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time();
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
