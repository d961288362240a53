//! Sliding window log for a single tenant.
//!
//! Each window keeps the exact timestamps of the requests it admitted
//! within the last `window_duration_ms`. Every evaluation prunes expired
//! entries, decides admission and records the new entry in one step; the
//! caller is responsible for holding the tenant's lock across the call.

use std::collections::VecDeque;

use tracing::trace;

use super::policy::RateLimitPolicy;
use crate::error::AdmissionError;

/// Outcome of evaluating one request against a tenant window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request was recorded in the window.
    Admitted {
        /// Admissions left in the current window after this one.
        remaining: u64,
        /// Epoch seconds at which this admission stops counting.
        reset_at_epoch_secs: u64,
    },
    /// The window is full.
    Denied {
        /// Seconds until the oldest entry expires.
        retry_after_secs: u64,
        /// Epoch seconds at which the oldest entry stops counting.
        reset_at_epoch_secs: u64,
    },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }

    /// Remaining admissions; zero for a denial.
    pub fn remaining(&self) -> u64 {
        match self {
            Decision::Admitted { remaining, .. } => *remaining,
            Decision::Denied { .. } => 0,
        }
    }

    pub fn reset_at_epoch_secs(&self) -> u64 {
        match self {
            Decision::Admitted {
                reset_at_epoch_secs,
                ..
            }
            | Decision::Denied {
                reset_at_epoch_secs,
                ..
            } => *reset_at_epoch_secs,
        }
    }

    /// Retry delay; zero for an admission.
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Decision::Admitted { .. } => 0,
            Decision::Denied {
                retry_after_secs, ..
            } => *retry_after_secs,
        }
    }
}

/// Ordered log of admitted request timestamps for one tenant.
#[derive(Debug, Default)]
pub struct TenantWindow {
    /// Admitted timestamps in epoch milliseconds, oldest first.
    timestamps: VecDeque<u64>,
    /// Time of the most recent evaluation, admitted or not.
    last_seen_ms: u64,
}

impl TenantWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prune, check and admit as a single transaction.
    ///
    /// Returns `InternalState` without touching the log if `now` is older
    /// than the newest recorded admission, since appending it would break
    /// the ascending order the pruning relies on.
    pub fn evaluate(
        &mut self,
        now: u64,
        policy: &RateLimitPolicy,
    ) -> Result<Decision, AdmissionError> {
        if let Some(&newest) = self.timestamps.back() {
            if now < newest {
                return Err(AdmissionError::InternalState(format!(
                    "evaluation time {} precedes newest admission {}",
                    now, newest
                )));
            }
        }
        self.last_seen_ms = now;

        let window_ms = policy.window_duration_ms();
        let pruned = self.prune(now, window_ms);

        let max_requests = policy.max_requests();
        if self.timestamps.len() as u64 >= max_requests {
            // A full window is never empty because max_requests > 0.
            let oldest = self.timestamps.front().copied().ok_or_else(|| {
                AdmissionError::InternalState("full window has no entries".to_string())
            })?;
            let expires_at = oldest + window_ms;
            let retry_after_secs = expires_at.saturating_sub(now).div_ceil(1000);

            trace!(
                now = now,
                pruned = pruned,
                oldest = oldest,
                retry_after_secs = retry_after_secs,
                "Window full"
            );

            return Ok(Decision::Denied {
                retry_after_secs,
                reset_at_epoch_secs: expires_at.div_ceil(1000),
            });
        }

        self.timestamps.push_back(now);
        let remaining = max_requests - self.timestamps.len() as u64;

        trace!(
            now = now,
            pruned = pruned,
            remaining = remaining,
            "Request admitted"
        );

        Ok(Decision::Admitted {
            remaining,
            reset_at_epoch_secs: (now + window_ms).div_ceil(1000),
        })
    }

    /// Drop every entry at least `window_ms` old. Returns how many were dropped.
    fn prune(&mut self, now: u64, window_ms: u64) -> usize {
        let mut pruned = 0;
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_sub(oldest) < window_ms {
                break;
            }
            self.timestamps.pop_front();
            pruned += 1;
        }
        pruned
    }

    /// Number of admissions currently recorded.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Newest recorded admission, if any.
    pub fn newest(&self) -> Option<u64> {
        self.timestamps.back().copied()
    }

    /// Oldest recorded admission, if any.
    pub fn oldest(&self) -> Option<u64> {
        self.timestamps.front().copied()
    }

    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }

    /// True once the window has held no live entry for a full window,
    /// i.e. nothing has been evaluated for two window durations.
    pub fn is_idle(&self, now: u64, policy: &RateLimitPolicy) -> bool {
        let idle_after = policy.window_duration_ms().saturating_mul(2);
        now.saturating_sub(self.last_seen_ms) >= idle_after
    }

    #[cfg(test)]
    pub(crate) fn timestamps(&self) -> Vec<u64> {
        self.timestamps.iter().copied().collect()
    }
}
