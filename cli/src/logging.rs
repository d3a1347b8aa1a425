use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "STUDIO_LOG";

/// Install a stderr subscriber. `STUDIO_LOG` takes precedence over the
/// verbosity flag.
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
