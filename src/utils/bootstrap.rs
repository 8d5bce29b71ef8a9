//! Bootstrap utilities.
//!
//! Shared initialization code for the host plugin and the broadcaster binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the BROADCASTER_LOG environment variable.
///
/// Defaults to "info" level if BROADCASTER_LOG is not set. Safe to call more
/// than once: a host that reloads the plugin keeps its first subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }
}
