//! Process-wide `tracing` subscriber installation.
//!
//! Components log through the `tracing` macros with a component target
//! (`interceptor`, `incoming`, `track`, `sc_processor`, `preprocess`,
//! `accounts_cache`, `sync`). Installing the subscriber is the only process-wide step and
//! belongs to process start.

use tracing_subscriber::EnvFilter;

/// Install the formatting subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used
/// (e.g. `"info,track=debug"`). Returns false if a subscriber was already
/// installed.
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

/// Install a test-writer subscriber, ignoring repeated calls.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_for_tests_is_idempotent() {
        init_for_tests();
        init_for_tests();
        // a subscriber is already installed
        assert!(!init("debug"));
    }
}
