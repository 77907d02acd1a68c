use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warden_core::constants::WARDEN_LOG_VAR;

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// The filter is read from `WARDEN_LOG` (falling back to `RUST_LOG`, then
/// `info`). Output goes to stderr so command output on stdout stays clean.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(WARDEN_LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span covering one authorization check
pub fn authorize_span(principal: &str, requirement: &str) -> Span {
    span!(Level::DEBUG, "authorize", principal = %principal, requirement = %requirement)
}

/// Span covering one invalidation cascade
pub fn invalidation_span(scope: &str, target: &str) -> Span {
    span!(Level::INFO, "invalidate", scope = %scope, target = %target)
}
