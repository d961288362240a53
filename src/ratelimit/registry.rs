//! Process-wide tenant registry.
//!
//! Created empty at startup and lives for the whole process; nothing here
//! is persisted. Entries are created lazily on a tenant's first request
//! and, unless idle eviction is enabled, are never removed.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::policy::RateLimitPolicy;
use super::tenant::TenantId;
use super::window::TenantWindow;

/// A tenant window guarded by its own lock.
pub type SharedWindow = Arc<Mutex<TenantWindow>>;

/// Maps tenant identifiers to their sliding window logs.
///
/// The map is sharded, so lookups for different tenants rarely contend,
/// and each window has its own mutex so evaluations only serialize per
/// tenant.
#[derive(Debug, Default)]
pub struct TenantRegistry {
    windows: DashMap<TenantId, SharedWindow>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the tenant's window, creating an empty one if absent.
    ///
    /// Concurrent first requests for the same tenant all receive the same
    /// window: creation happens under the shard's write lock.
    pub fn get_or_create(&self, tenant: &TenantId) -> SharedWindow {
        if let Some(window) = self.windows.get(tenant.as_str()) {
            return Arc::clone(window.value());
        }

        let window = self.windows.entry(tenant.clone()).or_insert_with(|| {
            debug!(tenant = %tenant, "Creating new tenant window");
            Arc::new(Mutex::new(TenantWindow::new()))
        });
        Arc::clone(window.value())
    }

    /// Return the tenant's window without creating it.
    pub fn get(&self, tenant: &str) -> Option<SharedWindow> {
        self.windows.get(tenant).map(|window| Arc::clone(window.value()))
    }

    pub fn contains(&self, tenant: &str) -> bool {
        self.windows.contains_key(tenant)
    }

    /// Number of tracked tenants.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop every tenant window.
    pub fn clear(&self) {
        self.windows.clear();
    }

    /// Remove tenants whose windows have been idle for a full window.
    ///
    /// A window still referenced outside the registry belongs to an
    /// in-flight evaluation and is kept. The check runs under the shard
    /// write lock, so no new reference can be handed out meanwhile.
    pub fn evict_idle(&self, now: u64, policy: &RateLimitPolicy) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            Arc::strong_count(window) > 1 || !window.lock().is_idle(now, policy)
        });
        let evicted = before.saturating_sub(self.windows.len());

        if evicted > 0 {
            debug!(evicted = evicted, remaining = self.windows.len(), "Evicted idle tenants");
        }
        evicted
    }
}
