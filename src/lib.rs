//! Tenantgate - Per-Tenant Rate Limiting
//!
//! This crate gates inbound requests per tenant so that no tenant exceeds a
//! fixed request budget within a rolling time window. Admission uses a
//! sliding window log kept in memory for the lifetime of the process, and
//! an axum middleware exposes the decision as `X-RateLimit-*` headers or a
//! structured rejection.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
pub mod simulate;
