//! Generic per-entity business service.
//!
//! A thin orchestration layer: validate input shape, delegate to the
//! repository through a unit of work, and hand the entity back to the
//! inbound adapter. Every call opens and closes its own scope, so each
//! service call is independently atomic; there is no cross-call scope
//! reuse.

use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::StreamExt;

use crate::domain::entity::Entity;
use crate::domain::error::{DomainResult, Error};
use crate::domain::ports::EntityStore;
use crate::domain::unit_of_work::{Predicate, UnitOfWork};

/// Entity-type-parameterised CRUD service over store `S`.
///
/// Repository errors (`NotFound`, `Conflict`) pass through unchanged;
/// validation failures are raised here before any store access.
pub struct EntityService<S, E: Entity> {
    store: Arc<S>,
    _entity: PhantomData<fn() -> E>,
}

impl<S, E: Entity> Clone for EntityService<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<S, E> EntityService<S, E>
where
    S: EntityStore<E>,
    E: Entity,
{
    /// Construct a service issuing unit-of-work scopes against `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Create a new entity and return it with its store-generated
    /// identifier.
    ///
    /// # Errors
    /// [`Error::Validation`] before any store access when the input
    /// carries an identifier or fails shape checks; otherwise repository
    /// and store errors from the commit.
    pub async fn create(&self, entity: E) -> DomainResult<E> {
        if entity.key().is_some() {
            return Err(Error::validation(format!(
                "{} create must not carry an identifier",
                E::NAME
            )));
        }
        entity.validate()?;

        let mut scope = UnitOfWork::new(Arc::clone(&self.store));
        scope.begin()?;
        scope.repository::<E>()?.add(entity.clone())?;
        let receipt = scope.commit().await?;
        let key = receipt
            .generated_keys::<E>()
            .into_iter()
            .next()
            .ok_or_else(|| Error::store("commit yielded no generated identifier"))?;
        Ok(entity.with_key(key))
    }

    /// Fetch one entity.
    ///
    /// # Errors
    /// [`Error::NotFound`] when no row has identifier `id`.
    pub async fn get(&self, id: E::Key) -> DomainResult<E> {
        let mut scope = UnitOfWork::new(Arc::clone(&self.store));
        scope.begin()?;
        let found = scope.repository::<E>()?.get_by_id(id).await?;
        scope.rollback();
        found.ok_or_else(|| Error::not_found(E::NAME, id))
    }

    /// List entities, optionally filtered.
    ///
    /// # Errors
    /// Propagates store read failures.
    pub async fn list(&self, filter: Option<Predicate<E>>) -> DomainResult<Vec<E>> {
        let mut scope = UnitOfWork::new(Arc::clone(&self.store));
        scope.begin()?;
        let rows = scope.repository::<E>()?.get_all(filter).await?;
        let items = rows.collect().await;
        scope.rollback();
        Ok(items)
    }

    /// Overwrite all mutable fields of the entity with identifier `id`.
    ///
    /// # Errors
    /// [`Error::Validation`] before any store access on shape failures;
    /// [`Error::NotFound`] when the row is absent.
    pub async fn update(&self, id: E::Key, entity: E) -> DomainResult<E> {
        if entity.key().is_some() {
            return Err(Error::validation(format!(
                "{} update input must not carry an identifier; the path identifies the row",
                E::NAME
            )));
        }
        let entity = entity.with_key(id);
        entity.validate()?;

        let mut scope = UnitOfWork::new(Arc::clone(&self.store));
        scope.begin()?;
        scope.repository::<E>()?.update(entity.clone())?;
        scope.commit().await?;
        Ok(entity)
    }

    /// Delete the entity with identifier `id`.
    ///
    /// # Errors
    /// [`Error::NotFound`] when absent; [`Error::Conflict`] when other
    /// rows still reference it (reject, never cascade).
    pub async fn delete(&self, id: E::Key) -> DomainResult<()> {
        let mut scope = UnitOfWork::new(Arc::clone(&self.store));
        scope.begin()?;
        scope.repository::<E>()?.remove(id);
        scope.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
