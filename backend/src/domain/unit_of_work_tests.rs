//! Scope lifecycle, staging, overlay reads, and commit atomicity.

use std::sync::Arc;

use futures_util::StreamExt;

use crate::domain::ports::EntityStore;
use crate::domain::unit_of_work::{Predicate, UnitOfWork};
use crate::domain::{Author, AuthorId, Book, BookId, Entity, Error};
use crate::outbound::persistence::MemoryStore;

fn author(first: &str, last: &str) -> Author {
    Author::new(first, last, None)
}

/// Commit one author and hand back the scope-ready store and its key.
async fn seeded_store() -> (Arc<MemoryStore>, AuthorId) {
    let store = Arc::new(MemoryStore::new());
    let mut scope = UnitOfWork::new(Arc::clone(&store));
    scope.begin().expect("begin");
    scope
        .repository::<Author>()
        .expect("repository")
        .add(author("Jane", "Austen"))
        .expect("add");
    let receipt = scope.commit().await.expect("commit");
    let key = receipt.generated_keys::<Author>()[0];
    (store, key)
}

#[tokio::test]
async fn staged_operations_leave_the_store_untouched_before_commit() {
    let store = Arc::new(MemoryStore::new());
    let mut scope = UnitOfWork::new(Arc::clone(&store));
    scope.begin().expect("begin");
    scope
        .repository::<Author>()
        .expect("repository")
        .add(author("Jane", "Austen"))
        .expect("add");

    let committed: Vec<Author> = store.fetch_all().await.expect("fetch_all");
    assert!(committed.is_empty());
}

#[tokio::test]
async fn commit_applies_staged_operations_and_reports_generated_keys() {
    let store = Arc::new(MemoryStore::new());
    let mut scope = UnitOfWork::new(Arc::clone(&store));
    scope.begin().expect("begin");
    {
        let mut authors = scope.repository::<Author>().expect("repository");
        authors.add(author("Jane", "Austen")).expect("add");
        authors.add(author("Mary", "Shelley")).expect("add");
    }
    let receipt = scope.commit().await.expect("commit");

    let keys = receipt.generated_keys::<Author>();
    assert_eq!(keys.len(), 2);
    assert!(keys[0] < keys[1]);
    assert!(receipt.generated_keys::<Book>().is_empty());
    let committed: Vec<Author> = store.fetch_all().await.expect("fetch_all");
    assert_eq!(committed.len(), 2);
}

#[tokio::test]
async fn commit_spans_entity_types_in_one_transaction() {
    let (store, jane) = seeded_store().await;
    let mut scope = UnitOfWork::new(Arc::clone(&store));
    scope.begin().expect("begin");
    scope
        .repository::<Author>()
        .expect("authors")
        .add(author("Mary", "Shelley"))
        .expect("add author");
    scope
        .repository::<Book>()
        .expect("books")
        .add(Book::new("Emma", jane))
        .expect("add book");
    let receipt = scope.commit().await.expect("commit");

    assert_eq!(receipt.generated_keys::<Author>().len(), 1);
    assert_eq!(receipt.generated_keys::<Book>().len(), 1);
    assert_eq!(receipt.len(), 2);
}

#[tokio::test]
async fn a_failed_operation_rolls_back_the_whole_commit() {
    let (store, jane) = seeded_store().await;
    let mut scope = UnitOfWork::new(Arc::clone(&store));
    scope.begin().expect("begin");
    {
        let mut authors = scope.repository::<Author>().expect("repository");
        authors.add(author("Mary", "Shelley")).expect("add");
        authors.remove(AuthorId::new(999));
    }
    let err = scope.commit().await.expect_err("commit must fail");

    assert!(matches!(err, Error::NotFound { .. }));
    let committed: Vec<Author> = store.fetch_all().await.expect("fetch_all");
    assert_eq!(committed.len(), 1, "only the seeded author survives");
    assert_eq!(committed[0].key(), Some(jane));
}

#[tokio::test]
async fn a_failed_commit_closes_the_scope() {
    let (store, _) = seeded_store().await;
    let mut scope = UnitOfWork::new(store);
    scope.begin().expect("begin");
    scope
        .repository::<Author>()
        .expect("repository")
        .remove(AuthorId::new(999));
    scope.commit().await.expect_err("commit must fail");

    let err = scope.commit().await.expect_err("scope is closed");
    assert!(matches!(err, Error::State(_)));
}

#[tokio::test]
async fn rollback_discards_staged_operations() {
    let (store, jane) = seeded_store().await;
    let mut scope = UnitOfWork::new(Arc::clone(&store));
    scope.begin().expect("begin");
    scope.repository::<Author>().expect("repository").remove(jane);
    scope.rollback();

    let committed: Vec<Author> = store.fetch_all().await.expect("fetch_all");
    assert_eq!(committed.len(), 1);
    let err = scope.commit().await.expect_err("rolled-back scope cannot commit");
    assert!(matches!(err, Error::State(_)));
}

#[tokio::test]
async fn lifecycle_violations_fail_with_state_errors() {
    let store = Arc::new(MemoryStore::new());
    let mut scope = UnitOfWork::new(store);

    let err = scope.repository::<Author>().expect_err("idle scope");
    assert!(matches!(err, Error::State(_)));
    let err = scope.commit().await.expect_err("idle scope");
    assert!(matches!(err, Error::State(_)));

    scope.begin().expect("begin");
    let err = scope.begin().expect_err("already open");
    assert!(matches!(err, Error::State(_)));
}

#[tokio::test]
async fn add_rejects_an_entity_that_already_has_a_key() {
    let store = Arc::new(MemoryStore::new());
    let mut scope = UnitOfWork::new(store);
    scope.begin().expect("begin");
    let err = scope
        .repository::<Author>()
        .expect("repository")
        .add(author("Jane", "Austen").with_key(AuthorId::new(1)))
        .expect_err("preset key must fail");
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn update_requires_a_key() {
    let store = Arc::new(MemoryStore::new());
    let mut scope = UnitOfWork::new(store);
    scope.begin().expect("begin");
    let err = scope
        .repository::<Author>()
        .expect("repository")
        .update(author("Jane", "Austen"))
        .expect_err("keyless update must fail");
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn get_by_id_overlays_staged_updates_and_removals() {
    let (store, jane) = seeded_store().await;
    let mut scope = UnitOfWork::new(store);
    scope.begin().expect("begin");
    let mut authors = scope.repository::<Author>().expect("repository");

    let renamed = author("Jane", "Doe").with_key(jane);
    authors.update(renamed.clone()).expect("update");
    let seen = authors.get_by_id(jane).await.expect("get_by_id");
    assert_eq!(seen, Some(renamed));

    authors.remove(jane);
    let seen = authors.get_by_id(jane).await.expect("get_by_id");
    assert_eq!(seen, None);
}

#[tokio::test]
async fn staged_updates_of_absent_rows_do_not_materialise_in_reads() {
    let store = Arc::new(MemoryStore::new());
    let mut scope = UnitOfWork::new(store);
    scope.begin().expect("begin");
    let mut authors = scope.repository::<Author>().expect("repository");

    let ghost = AuthorId::new(42);
    authors
        .update(author("No", "Body").with_key(ghost))
        .expect("staging succeeds; existence is checked at commit");
    let seen = authors.get_by_id(ghost).await.expect("get_by_id");
    assert_eq!(seen, None);
}

#[tokio::test]
async fn get_all_overlays_staged_changes_with_adds_at_the_end() {
    let (store, jane) = seeded_store().await;
    let mut scope = UnitOfWork::new(store);
    scope.begin().expect("begin");
    let mut authors = scope.repository::<Author>().expect("repository");
    authors
        .update(author("Jane", "Doe").with_key(jane))
        .expect("update");
    authors.add(author("Mary", "Shelley")).expect("add");

    let all: Vec<Author> = authors.get_all(None).await.expect("get_all").collect().await;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].last_name, "Doe");
    assert_eq!(all[1].last_name, "Shelley");
    assert_eq!(all[1].key(), None, "staged adds are keyless until commit");
}

#[tokio::test]
async fn get_all_hides_staged_removals() {
    let (store, jane) = seeded_store().await;
    let mut scope = UnitOfWork::new(store);
    scope.begin().expect("begin");
    let mut authors = scope.repository::<Author>().expect("repository");
    authors.remove(jane);

    let all: Vec<Author> = authors.get_all(None).await.expect("get_all").collect().await;
    assert!(all.is_empty());
}

#[tokio::test]
async fn get_all_applies_the_predicate_after_the_overlay() {
    let (store, _) = seeded_store().await;
    let mut scope = UnitOfWork::new(store);
    scope.begin().expect("begin");
    let mut authors = scope.repository::<Author>().expect("repository");
    authors.add(author("Mary", "Shelley")).expect("add");

    let filter: Predicate<Author> = Box::new(|candidate| candidate.last_name == "Shelley");
    let all: Vec<Author> = authors
        .get_all(Some(filter))
        .await
        .expect("get_all")
        .collect()
        .await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].first_name, "Mary");
}

#[tokio::test]
async fn repositories_acquired_later_in_a_scope_see_earlier_staging() {
    let (store, jane) = seeded_store().await;
    let mut scope = UnitOfWork::new(store);
    scope.begin().expect("begin");
    scope.repository::<Author>().expect("first handle").remove(jane);

    let seen = scope
        .repository::<Author>()
        .expect("second handle")
        .get_by_id(jane)
        .await
        .expect("get_by_id");
    assert_eq!(seen, None);
}

#[tokio::test]
async fn removing_a_book_leaves_its_author_alone() {
    let (store, jane) = seeded_store().await;
    let mut scope = UnitOfWork::new(Arc::clone(&store));
    scope.begin().expect("begin");
    scope
        .repository::<Book>()
        .expect("books")
        .add(Book::new("Emma", jane))
        .expect("add");
    let receipt = scope.commit().await.expect("commit");
    let emma: BookId = receipt.generated_keys::<Book>()[0];

    let mut scope = UnitOfWork::new(Arc::clone(&store));
    scope.begin().expect("begin");
    scope.repository::<Book>().expect("books").remove(emma);
    scope.commit().await.expect("commit");

    let authors: Vec<Author> = store.fetch_all().await.expect("fetch_all");
    assert_eq!(authors.len(), 1);
}
