//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the relational store and the external identity store). Adapters map
//! driver failures into the domain [`Error`](crate::domain::Error)
//! taxonomy instead of leaking their own error types.

use async_trait::async_trait;

use crate::domain::entity::Entity;
use crate::domain::error::DomainResult;

/// The transactional connection abstraction required of the store.
///
/// A transaction is opened only when a unit of work commits: staged
/// operations are replayed into one transaction and either all become
/// durable or none do. Reads outside a transaction observe committed
/// state at whatever isolation level the store provides (at least
/// read-committed is assumed).
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Backend transaction handle.
    type Txn: Send;

    /// Open a transaction.
    async fn begin(&self) -> DomainResult<Self::Txn>;

    /// Make the transaction durable.
    async fn commit(&self, txn: Self::Txn) -> DomainResult<()>;

    /// Discard the transaction.
    async fn rollback(&self, txn: Self::Txn) -> DomainResult<()>;
}

/// Parameterised CRUD for one entity type against the store.
///
/// One implementation exists per entity per backend. Mutations run inside
/// a caller-supplied transaction; reads observe committed state.
///
/// Error contract:
/// - `update`/`delete` of an absent row fail with `NotFound`.
/// - `insert`/`update`/`delete` breaking a relation invariant (a dangling
///   or still-referenced foreign key) fail with `Conflict`; deletes are
///   rejected, never cascaded.
#[async_trait]
pub trait EntityStore<E: Entity>: Store {
    /// Insert a keyless entity, returning the store-generated key.
    async fn insert(&self, txn: &mut Self::Txn, entity: &E) -> DomainResult<E::Key>;

    /// Overwrite all mutable fields of an existing row (last-writer-wins).
    async fn update(&self, txn: &mut Self::Txn, entity: &E) -> DomainResult<()>;

    /// Delete a row, rejecting when other rows still reference it.
    async fn delete(&self, txn: &mut Self::Txn, id: E::Key) -> DomainResult<()>;

    /// Fetch one committed row.
    async fn fetch(&self, id: E::Key) -> DomainResult<Option<E>>;

    /// Fetch all committed rows of this type.
    async fn fetch_all(&self) -> DomainResult<Vec<E>>;
}

/// A store capable of persisting the full bookstore entity model.
///
/// Blanket-implemented; composition roots and handlers use it as a single
/// bound instead of repeating the per-entity store constraints.
pub trait BookstoreStore:
    EntityStore<crate::domain::Author> + EntityStore<crate::domain::Book>
{
}

impl<S> BookstoreStore for S where
    S: EntityStore<crate::domain::Author> + EntityStore<crate::domain::Book>
{
}

/// Credential record supplied by the external identity store.
///
/// The gateway never persists credentials itself; it only reads records
/// through this port and verifies password hashes against them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRecord {
    /// Principal identifier embedded in issued tokens.
    pub id: i64,
    /// Login name, unique within the identity store.
    pub username: String,
    /// bcrypt hash of the principal's password.
    pub password_hash: String,
    /// Role claims granted to the principal.
    pub roles: Vec<String>,
}

/// The external identity boundary used by the auth gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up a credential record by login name.
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<PrincipalRecord>>;
}
