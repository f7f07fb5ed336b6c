//! The entity abstraction shared by the generic repository and services.
//!
//! An entity is a plain record with a unique identifier, mutable fields,
//! and zero or more relations to other entities. Identifiers are assigned
//! by the store when a staged insert commits; a caller supplying its own
//! identifier on create is rejected by the repository.

use std::fmt;
use std::hash::Hash;

use crate::domain::error::DomainResult;

/// A record type the generic repository and service layers can persist.
///
/// ## Invariants
/// - The identifier is immutable once assigned: `with_key` is only called
///   by infrastructure when the store generates a key at commit time.
/// - `validate` covers required-field shape only; relation invariants
///   (foreign references) are the store boundary's responsibility.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier type for this entity.
    type Key: Copy + Eq + Ord + Hash + fmt::Display + Send + Sync + 'static;

    /// Store-level name used in diagnostics and error messages.
    const NAME: &'static str;

    /// The assigned identifier, or `None` for a record not yet committed.
    fn key(&self) -> Option<Self::Key>;

    /// Return the entity with the given store-generated identifier.
    #[must_use]
    fn with_key(self, key: Self::Key) -> Self;

    /// Check required-field shape, without touching the store.
    fn validate(&self) -> DomainResult<()>;
}
