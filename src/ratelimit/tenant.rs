//! Tenant identifiers.

use std::borrow::Borrow;
use std::fmt;

/// The caller identity used as the rate limiting key.
///
/// Trusted as given; the only requirement is that it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(String);

impl TenantId {
    /// Parse a raw identifier. Returns `None` for an empty string.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TenantId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_empty() {
        assert!(TenantId::parse("").is_none());
    }

    #[test]
    fn test_parse_keeps_value_verbatim() {
        let tenant = TenantId::parse(" acme ").unwrap();
        assert_eq!(tenant.as_str(), " acme ");
        assert_eq!(tenant.to_string(), " acme ");
    }
}
