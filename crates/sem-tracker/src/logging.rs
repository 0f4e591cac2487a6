//! Logging setup for processes embedding the tracker.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Installs the global tracing subscriber.
///
/// INFO by default, overridable through `RUST_LOG`. Output goes to
/// stderr with thread names enabled so leak warnings are attributable
/// to the tracking thread.
pub fn init() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .init();
}
