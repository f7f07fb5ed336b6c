//! Inbound HTTP surface: handlers, wire DTOs, and the error envelope.
//!
//! Handlers stay thin: decode the wire payload, check the caller's role
//! where the route mutates state, delegate to the per-entity service, and
//! encode the result. Every domain error passes through
//! [`ApiError`](error::ApiError) unchanged in category.

pub mod auth;
pub mod authors;
pub mod books;
pub mod error;
pub mod health;

use std::sync::Arc;

use crate::domain::ports::BookstoreStore;
use crate::domain::{AuthGateway, AuthorService, BookService, Principal};

use self::error::ApiError;

/// Role required by every mutating route.
pub const ROLE_ADMIN: &str = "Admin";

/// Shared application state handed to every handler.
pub struct AppState<S> {
    /// Author CRUD service.
    pub authors: AuthorService<S>,
    /// Book CRUD service.
    pub books: BookService<S>,
    /// Token issuance and validation gateway.
    pub gateway: Arc<AuthGateway>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            authors: self.authors.clone(),
            books: self.books.clone(),
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<S: BookstoreStore> AppState<S> {
    /// Wire the per-entity services and the gateway over one store.
    #[must_use]
    pub fn new(store: Arc<S>, gateway: Arc<AuthGateway>) -> Self {
        Self {
            authors: AuthorService::new(Arc::clone(&store)),
            books: BookService::new(store),
            gateway,
        }
    }
}

/// Reject the request unless the principal carries `role`.
pub(crate) fn require_role(
    gateway: &AuthGateway,
    principal: &Principal,
    role: &str,
) -> Result<(), ApiError> {
    if gateway.authorize(principal, role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!("requires the {role} role")))
    }
}
