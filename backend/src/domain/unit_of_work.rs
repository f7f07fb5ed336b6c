//! Unit of work and the generic repository bound to it.
//!
//! A unit of work scopes repository operations over one or more entity
//! types into a single all-or-nothing transaction. Mutations are staged in
//! program order and replayed into one store transaction at commit; until
//! then the store is untouched, which makes `rollback` (and dropping an
//! open scope) infallible: there is never a dangling store transaction to
//! release.
//!
//! Reads through a repository overlay the scope's staged changes onto
//! committed store state, so a staged update or removal is visible to
//! later reads inside the same scope before it is durable.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error};

use crate::domain::entity::Entity;
use crate::domain::error::{DomainResult, Error};
use crate::domain::ports::{EntityStore, Store};

/// Row filter applied by [`Repository::get_all`].
pub type Predicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync + 'static>;

/// Lifecycle of a unit-of-work scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeState {
    /// Constructed but not yet begun.
    Idle,
    /// Accepting staged operations.
    Open,
    /// Flushed; staged operations are durable.
    Committed,
    /// Discarded; the store was left unchanged by this scope.
    RolledBack,
}

/// A staged mutation for one entity type.
enum Op<E: Entity> {
    Add(E),
    Update(E),
    Remove(E::Key),
}

/// Type-erased staged operation replayable against a store transaction.
#[async_trait]
trait StagedOp<S: Store>: Send + Sync {
    /// Apply the operation inside `txn`, returning the generated key for
    /// staged inserts.
    async fn apply(
        &self,
        store: &S,
        txn: &mut S::Txn,
    ) -> DomainResult<Option<(TypeId, Box<dyn Any + Send>)>>;

    /// Downcasting hook used by repositories to overlay staged changes.
    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<S, E> StagedOp<S> for Op<E>
where
    S: EntityStore<E>,
    E: Entity,
{
    async fn apply(
        &self,
        store: &S,
        txn: &mut S::Txn,
    ) -> DomainResult<Option<(TypeId, Box<dyn Any + Send>)>> {
        match self {
            Self::Add(entity) => {
                let key = store.insert(txn, entity).await?;
                Ok(Some((TypeId::of::<E>(), Box::new(key))))
            }
            Self::Update(entity) => {
                store.update(txn, entity).await?;
                Ok(None)
            }
            Self::Remove(id) => {
                store.delete(txn, *id).await?;
                Ok(None)
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Keys generated by the store for entities staged with
/// [`Repository::add`], in program order per entity type.
#[derive(Debug, Default)]
pub struct CommitReceipt {
    generated: Vec<(TypeId, Box<dyn Any + Send>)>,
}

impl CommitReceipt {
    /// Keys generated for staged adds of entity type `E`.
    #[must_use]
    pub fn generated_keys<E: Entity>(&self) -> Vec<E::Key> {
        self.generated
            .iter()
            .filter(|(type_id, _)| *type_id == TypeId::of::<E>())
            .filter_map(|(_, key)| key.downcast_ref::<E::Key>().copied())
            .collect()
    }

    /// Total number of generated keys across all entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generated.len()
    }

    /// Whether the commit generated no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generated.is_empty()
    }
}

/// Transactional scope coordinating repositories over a shared staged-op
/// log.
///
/// At most one scope serves one logical request; concurrent requests use
/// independent scopes, and cross-request visibility is governed by the
/// store's isolation level.
pub struct UnitOfWork<S: Store> {
    store: Arc<S>,
    state: ScopeState,
    log: Vec<Box<dyn StagedOp<S>>>,
}

impl<S: Store> UnitOfWork<S> {
    /// Construct an idle scope over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: ScopeState::Idle,
            log: Vec::new(),
        }
    }

    /// Open the transactional scope.
    ///
    /// # Errors
    /// Fails with [`Error::State`] when the scope is already open.
    pub fn begin(&mut self) -> DomainResult<()> {
        if self.state == ScopeState::Open {
            return Err(Error::state("scope is already open"));
        }
        self.state = ScopeState::Open;
        self.log.clear();
        Ok(())
    }

    /// Repository handle for entity type `E`, bound to this scope.
    ///
    /// Handles acquired repeatedly within one scope share the staged-op
    /// log, so changes staged through an earlier handle are visible to
    /// reads through a later one.
    ///
    /// # Errors
    /// Fails with [`Error::State`] when the scope is not open.
    pub fn repository<E>(&mut self) -> DomainResult<Repository<'_, S, E>>
    where
        S: EntityStore<E>,
        E: Entity,
    {
        if self.state != ScopeState::Open {
            return Err(Error::state("repository requires an open scope"));
        }
        Ok(Repository {
            scope: self,
            _entity: PhantomData,
        })
    }

    /// Flush all staged operations atomically, in program order, inside
    /// one store transaction.
    ///
    /// On success the scope closes and the receipt carries the keys the
    /// store generated for staged adds. On any failure the store
    /// transaction is rolled back, the staged log is discarded, and the
    /// store state is unchanged.
    ///
    /// # Errors
    /// [`Error::State`] when the scope is not open; otherwise the first
    /// failure raised while applying staged operations, or the store's
    /// commit failure.
    pub async fn commit(&mut self) -> DomainResult<CommitReceipt> {
        if self.state != ScopeState::Open {
            return Err(Error::state("commit requires an open scope"));
        }
        let store = Arc::clone(&self.store);
        let mut txn = store.begin().await?;
        let mut generated = Vec::new();
        let mut failure = None;
        for op in &self.log {
            match op.apply(store.as_ref(), &mut txn).await {
                Ok(Some(key)) => generated.push(key),
                Ok(None) => {}
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        if let Some(err) = failure {
            if let Err(rollback_err) = store.rollback(txn).await {
                error!(error = %rollback_err, "store rollback failed after staged operation error");
            }
            self.state = ScopeState::RolledBack;
            self.log.clear();
            return Err(err);
        }
        match store.commit(txn).await {
            Ok(()) => {
                self.state = ScopeState::Committed;
                self.log.clear();
                Ok(CommitReceipt { generated })
            }
            Err(err) => {
                self.state = ScopeState::RolledBack;
                self.log.clear();
                Err(err)
            }
        }
    }

    /// Discard all staged operations without applying them.
    ///
    /// Always succeeds: no store transaction exists before commit, so
    /// there is nothing fallible to release.
    pub fn rollback(&mut self) {
        if self.state == ScopeState::Open {
            self.state = ScopeState::RolledBack;
        }
        self.log.clear();
    }
}

impl<S: Store> Drop for UnitOfWork<S> {
    /// Scoped acquisition: a scope dropped while still open discards its
    /// staged work on every exit path, including error exits.
    fn drop(&mut self) {
        if self.state == ScopeState::Open && !self.log.is_empty() {
            debug!(
                staged = self.log.len(),
                "unit of work dropped while open; staged operations discarded"
            );
        }
    }
}

/// Type-parameterised CRUD over one entity type, bound to an open scope.
pub struct Repository<'scope, S: Store, E: Entity> {
    scope: &'scope mut UnitOfWork<S>,
    _entity: PhantomData<fn() -> E>,
}

impl<S: Store, E: Entity> std::fmt::Debug for Repository<'_, S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &E::NAME)
            .finish_non_exhaustive()
    }
}

impl<S, E> Repository<'_, S, E>
where
    S: EntityStore<E>,
    E: Entity,
{
    /// Stage an insert. The store-generated key is assigned only when the
    /// enclosing scope commits; it is reported through the
    /// [`CommitReceipt`].
    ///
    /// # Errors
    /// [`Error::Validation`] when required fields are absent or the caller
    /// supplied an identifier.
    pub fn add(&mut self, entity: E) -> DomainResult<()> {
        if entity.key().is_some() {
            return Err(Error::validation(format!(
                "{} create must not carry an identifier",
                E::NAME
            )));
        }
        entity.validate()?;
        self.scope.log.push(Box::new(Op::Add(entity)));
        Ok(())
    }

    /// Stage a last-writer-wins overwrite of all mutable fields.
    ///
    /// Existence is checked when the scope commits: an absent row fails
    /// the whole commit with [`Error::NotFound`].
    ///
    /// # Errors
    /// [`Error::Validation`] when the entity has no identifier or required
    /// fields are absent.
    pub fn update(&mut self, entity: E) -> DomainResult<()> {
        if entity.key().is_none() {
            return Err(Error::validation(format!(
                "{} update requires an identifier",
                E::NAME
            )));
        }
        entity.validate()?;
        self.scope.log.push(Box::new(Op::Update(entity)));
        Ok(())
    }

    /// Stage a removal.
    ///
    /// At commit an absent row fails with [`Error::NotFound`]; a row still
    /// referenced by other rows fails with [`Error::Conflict`] (reject,
    /// never cascade).
    pub fn remove(&mut self, id: E::Key) {
        self.scope.log.push(Box::new(Op::Remove(id)));
    }

    /// The entity with identifier `id`, or `None` when absent. Never
    /// errors for a missing row.
    ///
    /// Staged updates and removals in this scope overlay the committed
    /// row; staged adds are not addressable here because they have no key
    /// before commit.
    ///
    /// # Errors
    /// Propagates store read failures.
    pub async fn get_by_id(&self, id: E::Key) -> DomainResult<Option<E>> {
        let mut current = self.scope.store.fetch(id).await?;
        for op in &self.scope.log {
            let Some(op) = op.as_any().downcast_ref::<Op<E>>() else {
                continue;
            };
            match op {
                Op::Update(entity) if entity.key() == Some(id) => {
                    if current.is_some() {
                        current = Some(entity.clone());
                    }
                }
                Op::Remove(removed) if *removed == id => {
                    current = None;
                }
                _ => {}
            }
        }
        Ok(current)
    }

    /// A lazy, finite, non-restartable sequence over matching rows with
    /// this scope's staged changes overlaid; without a predicate, all rows
    /// of the type. Staged adds appear at the end of the sequence, still
    /// keyless.
    ///
    /// # Errors
    /// Propagates store read failures.
    pub async fn get_all(&self, predicate: Option<Predicate<E>>) -> DomainResult<BoxStream<'static, E>> {
        let rows = self.scope.store.fetch_all().await?;
        let mut by_key: BTreeMap<E::Key, E> = rows
            .into_iter()
            .filter_map(|entity| entity.key().map(|key| (key, entity)))
            .collect();
        let mut staged_adds = Vec::new();
        for op in &self.scope.log {
            let Some(op) = op.as_any().downcast_ref::<Op<E>>() else {
                continue;
            };
            match op {
                Op::Add(entity) => staged_adds.push(entity.clone()),
                Op::Update(entity) => {
                    if let Some(key) = entity.key() {
                        if by_key.contains_key(&key) {
                            by_key.insert(key, entity.clone());
                        }
                    }
                }
                Op::Remove(id) => {
                    by_key.remove(id);
                }
            }
        }
        let items = by_key
            .into_values()
            .chain(staged_adds)
            .filter(move |entity| predicate.as_ref().is_none_or(|keep| keep(entity)));
        Ok(stream::iter(items).boxed())
    }
}

#[cfg(test)]
#[path = "unit_of_work_tests.rs"]
mod tests;
