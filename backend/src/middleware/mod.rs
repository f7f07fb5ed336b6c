//! Request-scoped middleware.

pub mod auth;

pub use auth::{Authenticated, BearerAuth};
