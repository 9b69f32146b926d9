//! Log subscriber setup for hosts embedding the session.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "editor_session=info,runner_api=warn";

/// Installs a global fmt subscriber.
///
/// `filter` uses `EnvFilter` directive syntax; `None` falls back to
/// [`DEFAULT_LOG_FILTER`]. Returns `false` when a subscriber was already set
/// or the directives do not parse.
pub fn init(filter: Option<&str>) -> bool {
    let Some(filter) = env_filter(filter) else {
        return false;
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Parses `filter`, or [`DEFAULT_LOG_FILTER`] when absent.
pub fn env_filter(filter: Option<&str>) -> Option<EnvFilter> {
    EnvFilter::try_new(filter.unwrap_or(DEFAULT_LOG_FILTER)).ok()
}
