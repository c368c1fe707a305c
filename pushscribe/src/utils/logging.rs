use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "pushscribe=debug,warn";

/// Initialize logging with tracing
///
/// This function sets up the tracing subscriber with the following configuration:
/// - Reads filter from RUST_LOG environment variable if available
/// - Falls back to "pushscribe=debug,warn" if RUST_LOG is not set
/// - Uses a formatted output layer
///
/// Returns false when a global subscriber was already installed, so calling it
/// more than once (tests, embedding hosts) is harmless.
///
/// # Example
///
/// ```no_run
/// use pushscribe::utils::logging::init_logging;
///
/// init_logging();
/// ```
pub fn init_logging() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("PushScribe logging initialized");
    }
    installed
}
