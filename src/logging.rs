use crate::constants::LOG_ENV;
use tracing_subscriber::EnvFilter;

/// Filter used when `APOD_SYNC_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "apod_sync=debug,warn"
    } else {
        "apod_sync=info,warn"
    }
}

/// Install the global tracing subscriber.
///
/// Diagnostics go to stderr so stdout only carries progress lines. The
/// `APOD_SYNC_LOG` environment variable takes precedence over `verbose`.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
