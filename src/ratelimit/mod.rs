//! Rate limiting logic and state management.

mod clock;
mod limiter;
mod policy;
mod registry;
mod tenant;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::RateLimiter;
pub use policy::{RateLimitPolicy, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS};
pub use registry::{SharedWindow, TenantRegistry};
pub use tenant::TenantId;
pub use window::{Decision, TenantWindow};
