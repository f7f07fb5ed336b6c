//! In-memory reference store.
//!
//! Backs tests and pool-less operation. Transactions clone the committed
//! tables on begin and replace them wholesale on commit, so a scope's
//! mutations are invisible until commit and vanish on rollback. Writers
//! are expected to be serialised (tests, single-process demo runs);
//! concurrent committers are last-writer-wins.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{Author, AuthorId, Book, BookId, DomainResult, Entity, Error};
use crate::domain::ports::{EntityStore, Store};

/// Committed table state.
#[derive(Debug, Default, Clone)]
struct Tables {
    authors: BTreeMap<i64, Author>,
    books: BTreeMap<i64, Book>,
    author_seq: i64,
    book_seq: i64,
}

/// Working copy of the tables for one in-flight transaction.
#[derive(Debug)]
pub struct MemoryTxn {
    working: Tables,
}

/// In-memory transactional store over the bookstore tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> DomainResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::store("memory store mutex poisoned"))
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Txn = MemoryTxn;

    async fn begin(&self) -> DomainResult<MemoryTxn> {
        Ok(MemoryTxn {
            working: self.tables()?.clone(),
        })
    }

    async fn commit(&self, txn: MemoryTxn) -> DomainResult<()> {
        *self.tables()? = txn.working;
        Ok(())
    }

    async fn rollback(&self, _txn: MemoryTxn) -> DomainResult<()> {
        Ok(())
    }
}

#[async_trait]
impl EntityStore<Author> for MemoryStore {
    async fn insert(&self, txn: &mut MemoryTxn, entity: &Author) -> DomainResult<AuthorId> {
        txn.working.author_seq += 1;
        let key = AuthorId::new(txn.working.author_seq);
        txn.working
            .authors
            .insert(key.as_i64(), entity.clone().with_key(key));
        Ok(key)
    }

    async fn update(&self, txn: &mut MemoryTxn, entity: &Author) -> DomainResult<()> {
        let id = entity
            .key()
            .ok_or_else(|| Error::validation("author update requires an identifier"))?;
        if !txn.working.authors.contains_key(&id.as_i64()) {
            return Err(Error::not_found(Author::NAME, id));
        }
        txn.working.authors.insert(id.as_i64(), entity.clone());
        Ok(())
    }

    async fn delete(&self, txn: &mut MemoryTxn, id: AuthorId) -> DomainResult<()> {
        if !txn.working.authors.contains_key(&id.as_i64()) {
            return Err(Error::not_found(Author::NAME, id));
        }
        if txn
            .working
            .books
            .values()
            .any(|book| book.author_id == id)
        {
            return Err(Error::conflict(format!(
                "author {id} is still referenced by books"
            )));
        }
        txn.working.authors.remove(&id.as_i64());
        Ok(())
    }

    async fn fetch(&self, id: AuthorId) -> DomainResult<Option<Author>> {
        Ok(self.tables()?.authors.get(&id.as_i64()).cloned())
    }

    async fn fetch_all(&self) -> DomainResult<Vec<Author>> {
        Ok(self.tables()?.authors.values().cloned().collect())
    }
}

#[async_trait]
impl EntityStore<Book> for MemoryStore {
    async fn insert(&self, txn: &mut MemoryTxn, entity: &Book) -> DomainResult<BookId> {
        require_author(&txn.working, entity.author_id)?;
        txn.working.book_seq += 1;
        let key = BookId::new(txn.working.book_seq);
        txn.working
            .books
            .insert(key.as_i64(), entity.clone().with_key(key));
        Ok(key)
    }

    async fn update(&self, txn: &mut MemoryTxn, entity: &Book) -> DomainResult<()> {
        let id = entity
            .key()
            .ok_or_else(|| Error::validation("book update requires an identifier"))?;
        if !txn.working.books.contains_key(&id.as_i64()) {
            return Err(Error::not_found(Book::NAME, id));
        }
        require_author(&txn.working, entity.author_id)?;
        txn.working.books.insert(id.as_i64(), entity.clone());
        Ok(())
    }

    async fn delete(&self, txn: &mut MemoryTxn, id: BookId) -> DomainResult<()> {
        if txn.working.books.remove(&id.as_i64()).is_none() {
            return Err(Error::not_found(Book::NAME, id));
        }
        Ok(())
    }

    async fn fetch(&self, id: BookId) -> DomainResult<Option<Book>> {
        Ok(self.tables()?.books.get(&id.as_i64()).cloned())
    }

    async fn fetch_all(&self) -> DomainResult<Vec<Book>> {
        Ok(self.tables()?.books.values().cloned().collect())
    }
}

/// Mirror of the relational foreign key: a book row must reference an
/// existing author row.
fn require_author(tables: &Tables, author_id: AuthorId) -> DomainResult<()> {
    if tables.authors.contains_key(&author_id.as_i64()) {
        Ok(())
    } else {
        Err(Error::conflict(format!(
            "book references missing author {author_id}"
        )))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    fn jane() -> Author {
        Author::new("Jane", "Austen", None)
    }

    #[tokio::test]
    async fn mutations_are_invisible_until_commit() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.expect("begin");
        let key = store.insert(&mut txn, &jane()).await.expect("insert");

        assert!(EntityStore::<Author>::fetch(&store, key)
            .await
            .expect("fetch")
            .is_none());
        store.commit(txn).await.expect("commit");
        assert!(EntityStore::<Author>::fetch(&store, key)
            .await
            .expect("fetch")
            .is_some());
    }

    #[tokio::test]
    async fn rollback_discards_the_working_set() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.expect("begin");
        let key = store.insert(&mut txn, &jane()).await.expect("insert");
        store.rollback(txn).await.expect("rollback");

        assert!(EntityStore::<Author>::fetch(&store, key)
            .await
            .expect("fetch")
            .is_none());
    }

    #[tokio::test]
    async fn generated_keys_are_monotonic() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.expect("begin");
        let first = store.insert(&mut txn, &jane()).await.expect("insert");
        let second = store.insert(&mut txn, &jane()).await.expect("insert");
        assert!(second > first);
    }

    #[tokio::test]
    async fn deleting_a_referenced_author_conflicts() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.expect("begin");
        let author = store.insert(&mut txn, &jane()).await.expect("insert author");
        store
            .insert(&mut txn, &Book::new("Emma", author))
            .await
            .expect("insert book");

        let err = EntityStore::<Author>::delete(&store, &mut txn, author)
            .await
            .expect_err("delete must conflict");
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn inserting_a_book_without_its_author_conflicts() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.expect("begin");
        let err = store
            .insert(&mut txn, &Book::new("Emma", AuthorId::new(999)))
            .await
            .expect_err("dangling reference must conflict");
        assert!(matches!(err, Error::Conflict(_)));
    }
}
