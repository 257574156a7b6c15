//! Type-safe identifiers and validated scalar wrappers.
//!
//! Every identifier that crosses a port boundary (profile, book, edition,
//! user-book, read record, request) is wrapped in its own type so that a
//! `BookId` and an `EditionId` can never be silently swapped at a call site.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// A stable, non-empty string identifier for a [`super::profile::Profile`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidId("profile id is empty".to_string()));
        }
        Ok(Self(value))
    }

    /// Generates a fresh random id, for profiles created without an
    /// operator-supplied identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProfileId {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Opaque per-call correlation id attached to every outbound HTTP request and
/// tracing span, so a single book's HC/ABS calls can be grep'd out of logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Macro to stamp out the many small numeric-id newtypes shared across the
/// Hardcover domain (`BookId`, `EditionId`, `UserBookId`, `ReadRecordId`).
/// They are all non-negative Hardcover primary keys represented as `i64`.
macro_rules! hc_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }

            /// The sentinel used by the mismatch/edition payload when no
            /// canonical id is known yet.
            pub fn unknown() -> Self {
                Self(0)
            }

            pub fn is_unknown(&self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

hc_id!(BookId, "Hardcover `books.id`.");
hc_id!(EditionId, "Hardcover `editions.id`.");
hc_id!(UserBookId, "Hardcover `user_books.id`.");
hc_id!(ReadRecordId, "Hardcover `user_book_reads.id`.");

/// An Amazon Standard Identification Number, used by ASIN lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asin(String);

impl Asin {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(DomainError::ValidationFailed("ASIN is empty".to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_id_rejects_empty() {
        assert!(ProfileId::new("   ").is_err());
        assert!(ProfileId::new("p1").is_ok());
    }

    #[test]
    fn profile_id_generate_is_non_empty() {
        let id = ProfileId::generate();
        assert!(!id.as_str().is_empty());
    }

    #[test]
    fn hc_ids_display_and_roundtrip() {
        let book = BookId::from(100);
        assert_eq!(book.value(), 100);
        assert_eq!(book.to_string(), "100");
        assert!(!book.is_unknown());
        assert!(BookId::unknown().is_unknown());
    }

    #[test]
    fn asin_rejects_blank() {
        assert!(Asin::new("  ").is_err());
        assert_eq!(Asin::new("B0036VMS0Y").unwrap().as_str(), "B0036VMS0Y");
    }

    #[test]
    fn request_id_is_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
