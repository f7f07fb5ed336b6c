//! The `Author` entity and its identifier newtype.

use std::fmt;

use crate::domain::entity::Entity;
use crate::domain::error::{DomainResult, Error};

/// Store-assigned author identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuthorId(i64);

impl AuthorId {
    /// Wrap a raw identifier, e.g. one received on the wire.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier value for wire representations and SQL binding.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An author record. Books hold the foreign reference, not the author.
///
/// ## Invariants
/// - `first_name` and `last_name` must be non-blank once trimmed.
/// - `id` is `None` until the store assigns a key at commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    /// Store-assigned identifier, absent before the first commit.
    pub id: Option<AuthorId>,
    /// Given name; required.
    pub first_name: String,
    /// Family name; required.
    pub last_name: String,
    /// Optional free-form biography.
    pub bio: Option<String>,
}

impl Author {
    /// Construct an unsaved author record.
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        bio: Option<String>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            bio,
        }
    }
}

impl Entity for Author {
    type Key = AuthorId;

    const NAME: &'static str = "author";

    fn key(&self) -> Option<AuthorId> {
        self.id
    }

    fn with_key(mut self, key: AuthorId) -> Self {
        self.id = Some(key);
        self
    }

    fn validate(&self) -> DomainResult<()> {
        if self.first_name.trim().is_empty() {
            return Err(Error::validation("author first name must not be blank"));
        }
        if self.last_name.trim().is_empty() {
            return Err(Error::validation("author last name must not be blank"));
        }
        Ok(())
    }
}
