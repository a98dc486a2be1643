use tracing_subscriber::EnvFilter;

/// Default filter: dev builds log engine detail, release builds stay at info.
fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 if cfg!(debug_assertions) => "debug",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbosity`.
///
/// Logs go to stderr with thread names so timer-thread output is
/// distinguishable and stdout stays free for reports.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init();
}
