//! Domain-level error taxonomy.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses; outbound adapters map store and identity failures into the
//! variants defined here instead of leaking driver error types upward.

use std::fmt;

use thiserror::Error;

/// Failures raised by the auth gateway while issuing or validating tokens.
///
/// `authenticate` checks signature, issuer, audience, and expiry in that
/// order and short-circuits on the first failure, so callers can rely on
/// the subkind identifying the earliest broken check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Username lookup or password verification failed.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Token could not be decoded or its signature did not verify.
    #[error("token signature is invalid")]
    BadSignature,
    /// Token was signed for a different issuer.
    #[error("token issuer is not trusted")]
    WrongIssuer,
    /// Token was signed for a different audience.
    #[error("token audience does not match")]
    WrongAudience,
    /// Token expiry timestamp is in the past.
    #[error("token has expired")]
    Expired,
}

/// Core error returned by repositories, services, and the auth gateway.
///
/// Propagation policy: repository and gateway errors pass through the
/// service layer unchanged. Every failure either rolls back the active
/// unit of work or happened before any store access, so a caller never
/// observes a half-applied transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Input is malformed or missing required fields; the store was not
    /// touched.
    #[error("validation failed: {0}")]
    Validation(String),
    /// A referenced identifier does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity type name, e.g. `author`.
        entity: &'static str,
        /// Rendered identifier of the missing row.
        id: String,
    },
    /// The operation would violate a relation invariant.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Credential or token failure from the auth gateway.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Underlying transactional store failure; the active transaction is
    /// guaranteed rolled back before this surfaces.
    #[error("store failure: {0}")]
    Store(String),
    /// Unit-of-work scope misuse, e.g. `begin` on an already-open scope.
    #[error("unit of work state error: {0}")]
    State(String),
}

impl Error {
    /// Helper for validation failures.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Helper for missing rows, rendering the identifier for diagnostics.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Helper for relation-invariant conflicts.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Helper for store-level failures.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Helper for unit-of-work scope misuse.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }
}

/// Convenient result alias used throughout the domain.
pub type DomainResult<T> = Result<T, Error>;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[test]
    fn not_found_renders_entity_and_id() {
        let err = Error::not_found("author", 42);
        assert_eq!(err.to_string(), "author 42 not found");
    }

    #[test]
    fn auth_errors_convert_transparently() {
        let err: Error = AuthError::Expired.into();
        assert_eq!(err, Error::Auth(AuthError::Expired));
        assert_eq!(err.to_string(), "token has expired");
    }
}
