//! Core rate limiter implementation.

use std::sync::Arc;

use tracing::{debug, error, trace};

use super::clock::{Clock, SystemClock};
use super::policy::RateLimitPolicy;
use super::registry::TenantRegistry;
use super::tenant::TenantId;
use super::window::Decision;
use crate::error::AdmissionError;

/// The core rate limiter that manages tenant windows.
///
/// This struct is thread-safe and can be shared across multiple tasks.
/// `check` never blocks on I/O; the only waiting it does is on the lock
/// of the tenant being evaluated.
pub struct RateLimiter {
    /// Global policy applied to every tenant
    policy: RateLimitPolicy,
    /// Sliding window logs indexed by tenant
    registry: TenantRegistry,
    /// Time source for evaluations
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter driven by the wall clock.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock::new()))
    }

    /// Create a new rate limiter with a custom time source.
    pub fn with_clock(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            registry: TenantRegistry::new(),
            clock,
        }
    }

    /// Decide whether one request from `tenant` is admitted.
    ///
    /// The clock is read while holding the tenant's lock, and a reading
    /// older than the newest entry is raised to it, so entries are always
    /// appended in time order.
    pub fn check(&self, tenant: &TenantId) -> Result<Decision, AdmissionError> {
        let window = self.registry.get_or_create(tenant);

        let result = {
            let mut window = window.lock();
            let reading = self.clock.now_millis();
            let now = window.newest().map_or(reading, |newest| reading.max(newest));
            trace!(tenant = %tenant, now = now, "Checking rate limit");
            window.evaluate(now, &self.policy)
        };

        match &result {
            Ok(Decision::Denied {
                retry_after_secs, ..
            }) => {
                debug!(
                    tenant = %tenant,
                    retry_after_secs = *retry_after_secs,
                    "Rate limit exceeded"
                );
            }
            Ok(Decision::Admitted { .. }) => {}
            Err(err) => {
                error!(tenant = %tenant, error = %err, "Tenant window invariant violated");
            }
        }

        result
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Current time according to the limiter's clock.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Get the number of admissions recorded for a tenant.
    ///
    /// Returns `None` if the tenant has never been seen. The count is not
    /// pruned, so it may include entries that the next check will expire.
    pub fn window_len(&self, tenant: &str) -> Option<usize> {
        self.registry.get(tenant).map(|window| window.lock().len())
    }

    /// Get the number of tracked tenants.
    pub fn tenant_count(&self) -> usize {
        self.registry.len()
    }

    /// Remove tenants idle for at least a full window. Returns how many.
    pub fn evict_idle(&self) -> usize {
        self.registry.evict_idle(self.clock.now_millis(), &self.policy)
    }

    /// Clear all tenant windows.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.registry.clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}
