//! Book CRUD handlers.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::{AppState, ROLE_ADMIN, require_role};
use crate::domain::ports::BookstoreStore;
use crate::domain::unit_of_work::Predicate;
use crate::domain::{AuthorId, Book, BookId};
use crate::middleware::auth::Authenticated;

/// Wire payload for creating or replacing a book.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    /// Title; required.
    pub title: String,
    /// Optional ISBN string.
    #[serde(default)]
    pub isbn: Option<String>,
    /// Optional back-cover summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Optional publication year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Optional list price.
    #[serde(default)]
    pub price: Option<f64>,
    /// Identifier of the owning author; must exist at commit.
    pub author_id: i64,
}

impl From<BookPayload> for Book {
    fn from(payload: BookPayload) -> Self {
        let mut book = Self::new(payload.title, AuthorId::new(payload.author_id));
        book.isbn = payload.isbn;
        book.summary = payload.summary;
        book.year = payload.year;
        book.price = payload.price;
        book
    }
}

/// Wire representation of a persisted book.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    /// Store-assigned identifier.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Optional ISBN string.
    pub isbn: Option<String>,
    /// Optional summary.
    pub summary: Option<String>,
    /// Optional publication year.
    pub year: Option<i32>,
    /// Optional list price.
    pub price: Option<f64>,
    /// Identifier of the owning author.
    pub author_id: i64,
}

impl TryFrom<Book> for BookResponse {
    type Error = ApiError;

    fn try_from(book: Book) -> Result<Self, ApiError> {
        let id = book.id.ok_or_else(|| {
            ApiError::new(
                super::error::ErrorCode::InternalError,
                "persisted book is missing its identifier",
            )
        })?;
        Ok(Self {
            id: id.as_i64(),
            title: book.title,
            isbn: book.isbn,
            summary: book.summary,
            year: book.year,
            price: book.price,
            author_id: book.author_id.as_i64(),
        })
    }
}

/// Query filter accepted by the list route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListQuery {
    /// When set, only books referencing this author are returned.
    pub author_id: Option<i64>,
}

/// `GET /api/v1/books`
pub async fn list<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    _caller: Authenticated,
    query: web::Query<BookListQuery>,
) -> Result<web::Json<Vec<BookResponse>>, ApiError> {
    let filter: Option<Predicate<Book>> = query.into_inner().author_id.map(|author_id| {
        let author_id = AuthorId::new(author_id);
        Box::new(move |book: &Book| book.author_id == author_id) as Predicate<Book>
    });
    let books = state.books.list(filter).await?;
    let body = books
        .into_iter()
        .map(BookResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(web::Json(body))
}

/// `POST /api/v1/books` (Admin)
pub async fn create<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    Authenticated(caller): Authenticated,
    payload: web::Json<BookPayload>,
) -> Result<HttpResponse, ApiError> {
    require_role(&state.gateway, &caller, ROLE_ADMIN)?;
    let created = state.books.create(payload.into_inner().into()).await?;
    Ok(HttpResponse::Created().json(BookResponse::try_from(created)?))
}

/// `GET /api/v1/books/{id}`
pub async fn get<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    _caller: Authenticated,
    path: web::Path<i64>,
) -> Result<web::Json<BookResponse>, ApiError> {
    let book = state.books.get(BookId::new(path.into_inner())).await?;
    Ok(web::Json(BookResponse::try_from(book)?))
}

/// `PUT /api/v1/books/{id}` (Admin)
pub async fn update<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    Authenticated(caller): Authenticated,
    path: web::Path<i64>,
    payload: web::Json<BookPayload>,
) -> Result<web::Json<BookResponse>, ApiError> {
    require_role(&state.gateway, &caller, ROLE_ADMIN)?;
    let updated = state
        .books
        .update(BookId::new(path.into_inner()), payload.into_inner().into())
        .await?;
    Ok(web::Json(BookResponse::try_from(updated)?))
}

/// `DELETE /api/v1/books/{id}` (Admin)
pub async fn delete<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    Authenticated(caller): Authenticated,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    require_role(&state.gateway, &caller, ROLE_ADMIN)?;
    state.books.delete(BookId::new(path.into_inner())).await?;
    Ok(HttpResponse::NoContent().finish())
}
