//! Member identities.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque key for a segment member (an email address for the REST source).
///
/// Equality is exact and case-sensitive: `Alice@x.io` and `alice@x.io` are
/// two different members.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_case_sensitive() {
        assert_ne!(Identity::new("Alice@example.com"), Identity::new("alice@example.com"));
        assert_eq!(Identity::from("a@b.io"), Identity::new(String::from("a@b.io")));
    }

    #[test]
    fn test_identity_serializes_as_plain_string() {
        let id = Identity::new("x@y.io");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"x@y.io\"");

        let back: Identity = serde_json::from_str("\"x@y.io\"").unwrap();
        assert_eq!(back, id);
    }
}
