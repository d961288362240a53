//! Global rate limit policy.

use std::time::Duration;

use crate::error::{GateError, Result};

/// Default window length in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 60_000;
/// Default number of admitted requests per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 100;

/// Window duration and request budget shared by every tenant.
///
/// Immutable once built; the limiter and the HTTP layer only read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    window_duration_ms: u64,
    max_requests: u64,
}

impl RateLimitPolicy {
    /// Create a policy, rejecting a zero window or a zero budget.
    pub fn new(window_duration_ms: u64, max_requests: u64) -> Result<Self> {
        if window_duration_ms == 0 {
            return Err(GateError::InvalidPolicy(
                "window_duration_ms must be greater than zero".to_string(),
            ));
        }
        if max_requests == 0 {
            return Err(GateError::InvalidPolicy(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            window_duration_ms,
            max_requests,
        })
    }

    /// Window length in milliseconds.
    pub fn window_duration_ms(&self) -> u64 {
        self.window_duration_ms
    }

    /// Window length as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_duration_ms)
    }

    /// Maximum admitted requests per window.
    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// Human-readable window length, e.g. `60s` or `1500ms`.
    pub fn describe_window(&self) -> String {
        if self.window_duration_ms % 1000 == 0 {
            format!("{}s", self.window_duration_ms / 1000)
        } else {
            format!("{}ms", self.window_duration_ms)
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window_duration_ms: DEFAULT_WINDOW_MS,
            max_requests: DEFAULT_MAX_REQUESTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.window_duration_ms(), 60_000);
        assert_eq!(policy.max_requests(), 100);
        assert_eq!(policy.window(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            RateLimitPolicy::new(0, 10),
            Err(GateError::InvalidPolicy(_))
        ));
        assert!(matches!(
            RateLimitPolicy::new(1000, 0),
            Err(GateError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_describe_window() {
        assert_eq!(RateLimitPolicy::new(60_000, 1).unwrap().describe_window(), "60s");
        assert_eq!(RateLimitPolicy::new(1_500, 1).unwrap().describe_window(), "1500ms");
    }
}
