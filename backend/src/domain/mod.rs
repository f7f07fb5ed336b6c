//! Domain core: entities, ports, the unit of work, services, and the auth
//! gateway.
//!
//! Everything in here is transport agnostic. Inbound adapters (`api`,
//! `middleware`) translate HTTP into these types; driven adapters
//! (`outbound`) implement the ports.

pub mod auth;
pub mod author;
pub mod book;
pub mod entity;
pub mod error;
pub mod ports;
pub mod service;
pub mod unit_of_work;

pub use self::auth::{AuthGateway, LoginCredentials, Principal, SignedToken, TokenConfig};
pub use self::author::{Author, AuthorId};
pub use self::book::{Book, BookId};
pub use self::entity::Entity;
pub use self::error::{AuthError, DomainResult, Error};
pub use self::service::EntityService;
pub use self::unit_of_work::{CommitReceipt, Predicate, Repository, UnitOfWork};

/// Per-entity service aliases used by the composition root and handlers.
pub type AuthorService<S> = EntityService<S, Author>;
/// Book flavour of the generic service.
pub type BookService<S> = EntityService<S, Book>;
