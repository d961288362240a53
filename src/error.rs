//! Error types for the Tenantgate service.

use thiserror::Error;

/// Main error type for Tenantgate operations.
#[derive(Error, Debug)]
pub enum GateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rate limit policy that cannot be enforced
    #[error("Invalid rate limit policy: {0}")]
    InvalidPolicy(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for GateError {
    fn from(err: config::ConfigError) -> Self {
        GateError::Config(err.to_string())
    }
}

/// Result type alias for Tenantgate operations.
pub type Result<T> = std::result::Result<T, GateError>;

/// Reasons a single request is not admitted.
///
/// These are terminal decisions for the request that produced them; the
/// limiter never retries internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// The request carried no usable tenant identifier.
    #[error("Please provide a valid tenant ID in the {header} header")]
    MissingTenantIdentifier { header: String },

    /// The tenant has used its whole budget for the current window.
    #[error("Rate limit of {limit} requests per {window} exceeded for tenant {tenant}")]
    RateLimitExceeded {
        tenant: String,
        limit: u64,
        window: String,
        retry_after_secs: u64,
    },

    /// A tenant window was found violating its ordering invariant.
    #[error("Internal rate limiter state error: {0}")]
    InternalState(String),
}

impl AdmissionError {
    /// Stable machine-readable kind, used as the `error` field of bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AdmissionError::MissingTenantIdentifier { .. } => "MissingTenantIdentifier",
            AdmissionError::RateLimitExceeded { .. } => "RateLimitExceeded",
            AdmissionError::InternalState(_) => "InternalStateError",
        }
    }

    /// Seconds the caller should wait before retrying, when known.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AdmissionError::RateLimitExceeded {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}
