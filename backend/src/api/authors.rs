//! Author CRUD handlers.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::{AppState, ROLE_ADMIN, require_role};
use crate::domain::ports::BookstoreStore;
use crate::domain::unit_of_work::Predicate;
use crate::domain::{Author, AuthorId};
use crate::middleware::auth::Authenticated;

/// Wire payload for creating or replacing an author.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPayload {
    /// Given name; required.
    pub first_name: String,
    /// Family name; required.
    pub last_name: String,
    /// Optional free-form biography.
    #[serde(default)]
    pub bio: Option<String>,
}

impl From<AuthorPayload> for Author {
    fn from(payload: AuthorPayload) -> Self {
        Self::new(payload.first_name, payload.last_name, payload.bio)
    }
}

/// Wire representation of a persisted author.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorResponse {
    /// Store-assigned identifier.
    pub id: i64,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Optional biography.
    pub bio: Option<String>,
}

impl TryFrom<Author> for AuthorResponse {
    type Error = ApiError;

    fn try_from(author: Author) -> Result<Self, ApiError> {
        let id = author.id.ok_or_else(|| {
            ApiError::new(
                super::error::ErrorCode::InternalError,
                "persisted author is missing its identifier",
            )
        })?;
        Ok(Self {
            id: id.as_i64(),
            first_name: author.first_name,
            last_name: author.last_name,
            bio: author.bio,
        })
    }
}

/// Query filter accepted by the list route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorListQuery {
    /// When set, only authors with this exact family name are returned.
    pub last_name: Option<String>,
}

/// `GET /api/v1/authors`
pub async fn list<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    _caller: Authenticated,
    query: web::Query<AuthorListQuery>,
) -> Result<web::Json<Vec<AuthorResponse>>, ApiError> {
    let filter: Option<Predicate<Author>> = query.into_inner().last_name.map(|last_name| {
        Box::new(move |author: &Author| author.last_name == last_name) as Predicate<Author>
    });
    let authors = state.authors.list(filter).await?;
    let body = authors
        .into_iter()
        .map(AuthorResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(web::Json(body))
}

/// `POST /api/v1/authors` (Admin)
pub async fn create<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    Authenticated(caller): Authenticated,
    payload: web::Json<AuthorPayload>,
) -> Result<HttpResponse, ApiError> {
    require_role(&state.gateway, &caller, ROLE_ADMIN)?;
    let created = state.authors.create(payload.into_inner().into()).await?;
    Ok(HttpResponse::Created().json(AuthorResponse::try_from(created)?))
}

/// `GET /api/v1/authors/{id}`
pub async fn get<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    _caller: Authenticated,
    path: web::Path<i64>,
) -> Result<web::Json<AuthorResponse>, ApiError> {
    let author = state.authors.get(AuthorId::new(path.into_inner())).await?;
    Ok(web::Json(AuthorResponse::try_from(author)?))
}

/// `PUT /api/v1/authors/{id}` (Admin)
pub async fn update<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    Authenticated(caller): Authenticated,
    path: web::Path<i64>,
    payload: web::Json<AuthorPayload>,
) -> Result<web::Json<AuthorResponse>, ApiError> {
    require_role(&state.gateway, &caller, ROLE_ADMIN)?;
    let updated = state
        .authors
        .update(AuthorId::new(path.into_inner()), payload.into_inner().into())
        .await?;
    Ok(web::Json(AuthorResponse::try_from(updated)?))
}

/// `DELETE /api/v1/authors/{id}` (Admin)
pub async fn delete<S: BookstoreStore>(
    state: web::Data<AppState<S>>,
    Authenticated(caller): Authenticated,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    require_role(&state.gateway, &caller, ROLE_ADMIN)?;
    state.authors.delete(AuthorId::new(path.into_inner())).await?;
    Ok(HttpResponse::NoContent().finish())
}
