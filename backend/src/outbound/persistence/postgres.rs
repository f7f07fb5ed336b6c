//! PostgreSQL store adapter using `sqlx`.
//!
//! Referential integrity is delegated to the schema: `books.author_id`
//! carries `ON DELETE RESTRICT`, so the database rejects deleting a
//! referenced author and inserting a book with a dangling reference; both
//! surface here as conflicts.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::domain::ports::{EntityStore, Store};
use crate::domain::{Author, AuthorId, Book, BookId, DomainResult, Entity, Error};

/// PostgreSQL-backed transactional store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a small pool to `url`.
    ///
    /// # Errors
    /// Fails with [`Error::Store`] when the pool cannot be established.
    pub async fn connect(url: &str) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|err| Error::store(format!("database connection failed: {err}")))?;
        Ok(Self { pool })
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    /// Fails with [`Error::Store`] when a migration cannot be applied.
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| Error::store(format!("migration failed: {err}")))
    }
}

/// Map driver failures into the domain taxonomy. Foreign-key violations
/// are relation-invariant conflicts; everything else is a store failure.
fn map_sqlx_error(entity: &'static str, err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        debug!(entity, code = ?db.code(), "database operation failed");
        if matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation) {
            return Error::conflict(format!(
                "{entity} operation violates a relation invariant: {}",
                db.message()
            ));
        }
    }
    Error::store(format!("{entity} store operation failed: {err}"))
}

fn decode_failure(entity: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |err| Error::store(format!("{entity} row decode failed: {err}"))
}

fn author_from_row(row: &PgRow) -> DomainResult<Author> {
    let col = decode_failure(Author::NAME);
    Ok(Author {
        id: Some(AuthorId::new(row.try_get::<i64, _>("id").map_err(&col)?)),
        first_name: row.try_get("first_name").map_err(&col)?,
        last_name: row.try_get("last_name").map_err(&col)?,
        bio: row.try_get("bio").map_err(&col)?,
    })
}

fn book_from_row(row: &PgRow) -> DomainResult<Book> {
    let col = decode_failure(Book::NAME);
    Ok(Book {
        id: Some(BookId::new(row.try_get::<i64, _>("id").map_err(&col)?)),
        title: row.try_get("title").map_err(&col)?,
        isbn: row.try_get("isbn").map_err(&col)?,
        summary: row.try_get("summary").map_err(&col)?,
        year: row.try_get("year").map_err(&col)?,
        price: row.try_get("price").map_err(&col)?,
        author_id: AuthorId::new(row.try_get::<i64, _>("author_id").map_err(&col)?),
    })
}

#[async_trait]
impl Store for PgStore {
    type Txn = Transaction<'static, Postgres>;

    async fn begin(&self) -> DomainResult<Self::Txn> {
        self.pool
            .begin()
            .await
            .map_err(|err| Error::store(format!("transaction begin failed: {err}")))
    }

    async fn commit(&self, txn: Self::Txn) -> DomainResult<()> {
        txn.commit()
            .await
            .map_err(|err| Error::store(format!("transaction commit failed: {err}")))
    }

    async fn rollback(&self, txn: Self::Txn) -> DomainResult<()> {
        txn.rollback()
            .await
            .map_err(|err| Error::store(format!("transaction rollback failed: {err}")))
    }
}

#[async_trait]
impl EntityStore<Author> for PgStore {
    async fn insert(&self, txn: &mut Self::Txn, entity: &Author) -> DomainResult<AuthorId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO authors (first_name, last_name, bio) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&entity.first_name)
        .bind(&entity.last_name)
        .bind(&entity.bio)
        .fetch_one(&mut **txn)
        .await
        .map_err(|err| map_sqlx_error(Author::NAME, err))?;
        Ok(AuthorId::new(id))
    }

    async fn update(&self, txn: &mut Self::Txn, entity: &Author) -> DomainResult<()> {
        let id = entity
            .key()
            .ok_or_else(|| Error::validation("author update requires an identifier"))?;
        let result =
            sqlx::query("UPDATE authors SET first_name = $2, last_name = $3, bio = $4 WHERE id = $1")
                .bind(id.as_i64())
                .bind(&entity.first_name)
                .bind(&entity.last_name)
                .bind(&entity.bio)
                .execute(&mut **txn)
                .await
                .map_err(|err| map_sqlx_error(Author::NAME, err))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(Author::NAME, id));
        }
        Ok(())
    }

    async fn delete(&self, txn: &mut Self::Txn, id: AuthorId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut **txn)
            .await
            .map_err(|err| map_sqlx_error(Author::NAME, err))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(Author::NAME, id));
        }
        Ok(())
    }

    async fn fetch(&self, id: AuthorId) -> DomainResult<Option<Author>> {
        let row = sqlx::query("SELECT id, first_name, last_name, bio FROM authors WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(Author::NAME, err))?;
        row.as_ref().map(author_from_row).transpose()
    }

    async fn fetch_all(&self) -> DomainResult<Vec<Author>> {
        let rows = sqlx::query("SELECT id, first_name, last_name, bio FROM authors ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(Author::NAME, err))?;
        rows.iter().map(author_from_row).collect()
    }
}

#[async_trait]
impl EntityStore<Book> for PgStore {
    async fn insert(&self, txn: &mut Self::Txn, entity: &Book) -> DomainResult<BookId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO books (title, isbn, summary, year, price, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&entity.title)
        .bind(&entity.isbn)
        .bind(&entity.summary)
        .bind(entity.year)
        .bind(entity.price)
        .bind(entity.author_id.as_i64())
        .fetch_one(&mut **txn)
        .await
        .map_err(|err| map_sqlx_error(Book::NAME, err))?;
        Ok(BookId::new(id))
    }

    async fn update(&self, txn: &mut Self::Txn, entity: &Book) -> DomainResult<()> {
        let id = entity
            .key()
            .ok_or_else(|| Error::validation("book update requires an identifier"))?;
        let result = sqlx::query(
            "UPDATE books SET title = $2, isbn = $3, summary = $4, year = $5, price = $6, \
             author_id = $7 WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(&entity.title)
        .bind(&entity.isbn)
        .bind(&entity.summary)
        .bind(entity.year)
        .bind(entity.price)
        .bind(entity.author_id.as_i64())
        .execute(&mut **txn)
        .await
        .map_err(|err| map_sqlx_error(Book::NAME, err))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(Book::NAME, id));
        }
        Ok(())
    }

    async fn delete(&self, txn: &mut Self::Txn, id: BookId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut **txn)
            .await
            .map_err(|err| map_sqlx_error(Book::NAME, err))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(Book::NAME, id));
        }
        Ok(())
    }

    async fn fetch(&self, id: BookId) -> DomainResult<Option<Book>> {
        let row = sqlx::query(
            "SELECT id, title, isbn, summary, year, price, author_id FROM books WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error(Book::NAME, err))?;
        row.as_ref().map(book_from_row).transpose()
    }

    async fn fetch_all(&self) -> DomainResult<Vec<Book>> {
        let rows = sqlx::query(
            "SELECT id, title, isbn, summary, year, price, author_id FROM books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_sqlx_error(Book::NAME, err))?;
        rows.iter().map(book_from_row).collect()
    }
}
