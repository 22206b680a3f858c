use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize structured JSON logging on stderr.
///
/// Defaults to `warn` level unless overridden by `WORDVOX_LOG`. Stdout is left to the
/// human-readable reports printed by the binaries.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("WORDVOX_LOG"))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true),
        )
        .try_init();
}

fn env_filter(var: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(var)
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy()
}
