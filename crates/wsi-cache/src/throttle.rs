//! Per-endpoint suppression of repeated error logs.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

/// Default suppression window.
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_secs(30);

/// Lets one error log through per endpoint per window.
///
/// A flapping connection would otherwise emit an error for every failed
/// command. Safe to share across tasks and threads.
#[derive(Debug)]
pub struct ErrorLogThrottle {
    /// Suppression window.
    window: Duration,
    /// Endpoint URL -> instant until which further logs are suppressed.
    blocked_until: DashMap<String, Instant>,
}

impl ErrorLogThrottle {
    /// Create a throttle with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            blocked_until: DashMap::new(),
        }
    }

    /// Returns `true` if an error for `endpoint` should be logged now, and
    /// starts a new suppression window when it does.
    pub fn should_log(&self, endpoint: &str) -> bool {
        let now = Instant::now();
        match self.blocked_until.entry(endpoint.to_string()) {
            Entry::Occupied(mut entry) => {
                if now < *entry.get() {
                    return false;
                }
                entry.insert(now + self.window);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now + self.window);
                true
            }
        }
    }
}

impl Default for ErrorLogThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_repeat_errors_suppressed_until_window_expires() {
        let throttle = ErrorLogThrottle::default();
        assert!(throttle.should_log("redis://a:6379"));
        assert!(!throttle.should_log("redis://a:6379"));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!throttle.should_log("redis://a:6379"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(throttle.should_log("redis://a:6379"));
        assert!(!throttle.should_log("redis://a:6379"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_endpoints_are_independent() {
        let throttle = ErrorLogThrottle::new(Duration::from_secs(5));
        assert!(throttle.should_log("redis://a:6379"));
        assert!(throttle.should_log("redis://b:6379"));
        assert!(!throttle.should_log("redis://a:6379"));
        assert!(!throttle.should_log("redis://b:6379"));
    }
}
