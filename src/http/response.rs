//! Mapping of limiter decisions onto HTTP response metadata.

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::AdmissionError;
use crate::ratelimit::{Decision, RateLimitPolicy};

pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// `X-RateLimit-*` values for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u64,
    pub remaining: u64,
    /// Epoch seconds
    pub reset: u64,
}

impl RateLimitHeaders {
    /// Write the headers into `headers`, replacing existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(self.remaining));
        headers.insert(RESET_HEADER, HeaderValue::from(self.reset));
    }
}

/// What a denied request needs to tell its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
    pub retry_after_secs: u64,
}

/// Headers for every decision, plus the denial details when not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub headers: RateLimitHeaders,
    pub denial: Option<Denial>,
}

/// Translate a decision into response metadata.
pub fn respond(decision: &Decision, policy: &RateLimitPolicy) -> ResponseMetadata {
    let headers = RateLimitHeaders {
        limit: policy.max_requests(),
        remaining: decision.remaining(),
        reset: decision.reset_at_epoch_secs(),
    };

    let denial = match decision {
        Decision::Admitted { .. } => None,
        Decision::Denied {
            retry_after_secs, ..
        } => Some(Denial {
            retry_after_secs: *retry_after_secs,
        }),
    };

    ResponseMetadata { headers, denial }
}

/// JSON body of a short-circuited request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl From<&AdmissionError> for ErrorBody {
    fn from(err: &AdmissionError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
            retry_after: err.retry_after_secs(),
        }
    }
}

/// A request the gate refuses to pass downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRejection {
    pub error: AdmissionError,
    pub headers: Option<RateLimitHeaders>,
}

impl GateRejection {
    pub fn new(error: AdmissionError) -> Self {
        Self {
            error,
            headers: None,
        }
    }

    pub fn with_headers(mut self, headers: RateLimitHeaders) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            AdmissionError::MissingTenantIdentifier { .. } => StatusCode::BAD_REQUEST,
            AdmissionError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AdmissionError::InternalState(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<AdmissionError> for GateRejection {
    fn from(error: AdmissionError) -> Self {
        Self::new(error)
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let body = ErrorBody::from(&self.error);
        let mut response = (self.status(), Json(body)).into_response();

        let headers = response.headers_mut();
        if let Some(rate_limit_headers) = self.headers {
            rate_limit_headers.apply(headers);
        }
        if let Some(retry_after) = self.error.retry_after_secs() {
            headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    #[test]
    fn test_admitted_metadata() {
        let policy = RateLimitPolicy::default();
        let decision = Decision::Admitted {
            remaining: 42,
            reset_at_epoch_secs: 1_700_000_060,
        };

        let metadata = respond(&decision, &policy);

        assert_eq!(
            metadata.headers,
            RateLimitHeaders {
                limit: 100,
                remaining: 42,
                reset: 1_700_000_060,
            }
        );
        assert!(metadata.denial.is_none());
    }

    #[test]
    fn test_denied_metadata() {
        let policy = RateLimitPolicy::default();
        let decision = Decision::Denied {
            retry_after_secs: 17,
            reset_at_epoch_secs: 1_700_000_017,
        };

        let metadata = respond(&decision, &policy);

        assert_eq!(metadata.headers.remaining, 0);
        assert_eq!(metadata.headers.limit, 100);
        assert_eq!(metadata.denial, Some(Denial { retry_after_secs: 17 }));
    }

    #[test]
    fn test_apply_headers() {
        let mut headers = HeaderMap::new();
        RateLimitHeaders {
            limit: 100,
            remaining: 3,
            reset: 1_700_000_060,
        }
        .apply(&mut headers);

        assert_eq!(headers["x-ratelimit-limit"], "100");
        assert_eq!(headers["x-ratelimit-remaining"], "3");
        assert_eq!(headers["x-ratelimit-reset"], "1700000060");
    }

    #[tokio::test]
    async fn test_rate_limited_rejection_response() {
        let rejection = GateRejection::new(AdmissionError::RateLimitExceeded {
            tenant: "T1".to_string(),
            limit: 100,
            window: "60s".to_string(),
            retry_after_secs: 60,
        })
        .with_headers(RateLimitHeaders {
            limit: 100,
            remaining: 0,
            reset: 1_700_000_060,
        });

        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "60");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({
                "error": "RateLimitExceeded",
                "message": "Rate limit of 100 requests per 60s exceeded for tenant T1",
                "retryAfter": 60
            })
        );
    }

    #[tokio::test]
    async fn test_missing_tenant_rejection_response() {
        let response = GateRejection::new(AdmissionError::MissingTenantIdentifier {
            header: "x-tenant-id".to_string(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("retry-after").is_none());
        assert!(response.headers().get("x-ratelimit-limit").is_none());

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "MissingTenantIdentifier");
        assert!(body.get("retryAfter").is_none());
    }

    #[test]
    fn test_internal_state_is_service_unavailable() {
        let rejection = GateRejection::from(AdmissionError::InternalState("bad".to_string()));
        assert_eq!(rejection.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
