//! Per-request rate limiting entry point.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::response::{respond, GateRejection, RateLimitHeaders};
use crate::error::AdmissionError;
use crate::ratelimit::{RateLimiter, TenantId};

/// Shared state for the rate limiting middleware.
#[derive(Clone)]
pub struct GateState {
    limiter: Arc<RateLimiter>,
    tenant_header: HeaderName,
}

impl GateState {
    pub fn new(limiter: Arc<RateLimiter>, tenant_header: HeaderName) -> Self {
        Self {
            limiter,
            tenant_header,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn tenant_header(&self) -> &HeaderName {
        &self.tenant_header
    }
}

/// Read the tenant identifier from `header`.
///
/// A value that is not visible ASCII is treated the same as a missing one.
pub fn extract_tenant(headers: &HeaderMap, header: &HeaderName) -> Option<TenantId> {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .and_then(TenantId::parse)
}

/// Run the limiter for one request.
///
/// Returns the headers to attach to the downstream response, or the
/// rejection to send instead. A request without a tenant identifier never
/// touches the registry.
pub fn handle(state: &GateState, headers: &HeaderMap) -> Result<RateLimitHeaders, GateRejection> {
    let tenant = extract_tenant(headers, &state.tenant_header).ok_or_else(|| {
        GateRejection::new(AdmissionError::MissingTenantIdentifier {
            header: state.tenant_header.to_string(),
        })
    })?;

    let policy = state.limiter.policy();
    let decision = state.limiter.check(&tenant)?;
    let metadata = respond(&decision, policy);

    match metadata.denial {
        None => Ok(metadata.headers),
        Some(denial) => Err(GateRejection::new(AdmissionError::RateLimitExceeded {
            tenant: tenant.to_string(),
            limit: policy.max_requests(),
            window: policy.describe_window(),
            retry_after_secs: denial.retry_after_secs,
        })
        .with_headers(metadata.headers)),
    }
}

/// Axum middleware wrapping [`handle`].
pub async fn rate_limit(State(state): State<GateState>, request: Request, next: Next) -> Response {
    match handle(&state, request.headers()) {
        Ok(headers) => {
            let mut response = next.run(request).await;
            headers.apply(response.headers_mut());
            response
        }
        Err(rejection) => {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                kind = rejection.error.kind(),
                "Request rejected"
            );
            rejection.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{ManualClock, RateLimitPolicy};
    use axum::http::HeaderValue;

    const T0: u64 = 1_700_000_000_000;

    fn state(max_requests: u64) -> (GateState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let policy = RateLimitPolicy::new(60_000, max_requests).unwrap();
        let limiter = Arc::new(RateLimiter::with_clock(policy, clock.clone()));
        (
            GateState::new(limiter, HeaderName::from_static("x-tenant-id")),
            clock,
        )
    }

    fn headers_for(tenant: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_str(tenant).unwrap());
        headers
    }

    #[test]
    fn test_missing_header_short_circuits() {
        let (state, _clock) = state(10);

        let rejection = handle(&state, &HeaderMap::new()).unwrap_err();

        assert_eq!(
            rejection.error,
            AdmissionError::MissingTenantIdentifier {
                header: "x-tenant-id".to_string()
            }
        );
        assert!(rejection.headers.is_none());
        assert_eq!(state.limiter().tenant_count(), 0);
    }

    #[test]
    fn test_empty_header_is_missing() {
        let (state, _clock) = state(10);

        let rejection = handle(&state, &headers_for("")).unwrap_err();

        assert_eq!(rejection.error.kind(), "MissingTenantIdentifier");
        assert_eq!(state.limiter().tenant_count(), 0);
    }

    #[test]
    fn test_opaque_header_is_missing() {
        let (state, _clock) = state(10);
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_bytes(b"\xfftenant").unwrap());

        assert!(extract_tenant(&headers, state.tenant_header()).is_none());
    }

    #[test]
    fn test_admitted_request_returns_headers() {
        let (state, _clock) = state(10);

        let headers = handle(&state, &headers_for("T1")).unwrap();

        assert_eq!(
            headers,
            RateLimitHeaders {
                limit: 10,
                remaining: 9,
                reset: (T0 + 60_000) / 1000,
            }
        );
    }

    #[test]
    fn test_denied_request_carries_retry_and_zero_remaining() {
        let (state, clock) = state(2);
        handle(&state, &headers_for("T1")).unwrap();
        handle(&state, &headers_for("T1")).unwrap();
        clock.advance(1_500);

        let rejection = handle(&state, &headers_for("T1")).unwrap_err();

        assert_eq!(
            rejection.error,
            AdmissionError::RateLimitExceeded {
                tenant: "T1".to_string(),
                limit: 2,
                window: "60s".to_string(),
                retry_after_secs: 59,
            }
        );
        let headers = rejection.headers.unwrap();
        assert_eq!(headers.remaining, 0);
        assert_eq!(headers.limit, 2);
        assert_eq!(headers.reset, (T0 + 60_000) / 1000);
    }
}
