//! End-to-end coverage of the HTTP surface over the in-memory store.

use std::sync::Arc;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::{test, web};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

use bookstore_backend::api::health::HealthState;
use bookstore_backend::api::AppState;
use bookstore_backend::domain::auth::Claims;
use bookstore_backend::domain::ports::PrincipalRecord;
use bookstore_backend::domain::{AuthGateway, TokenConfig};
use bookstore_backend::outbound::identity::InMemoryIdentityStore;
use bookstore_backend::outbound::persistence::MemoryStore;
use bookstore_backend::server::build_app;

const SECRET: &str = "integration-test-secret";
const ISSUER: &str = "bookstore";
const AUDIENCE: &str = "bookstore-clients";

fn record(id: i64, username: &str, password: &str, roles: &[&str]) -> PrincipalRecord {
    PrincipalRecord {
        id,
        username: username.into(),
        // Low cost keeps the hash cheap under test.
        password_hash: bcrypt::hash(password, 4).expect("hash"),
        roles: roles.iter().map(|role| (*role).to_owned()).collect(),
    }
}

fn test_state() -> AppState<MemoryStore> {
    let identity = InMemoryIdentityStore::new()
        .with_record(record(1, "admin", "admin-pw", &["Admin"]))
        .with_record(record(2, "reader", "reader-pw", &["Reader"]));
    let config = TokenConfig::new(SECRET, ISSUER, AUDIENCE, 3600).expect("token config");
    let gateway = Arc::new(AuthGateway::new(Arc::new(identity), config));
    AppState::new(Arc::new(MemoryStore::new()), gateway)
}

async fn spawn_app() -> impl Service<
    Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    let health = web::Data::new(HealthState::new());
    health.mark_ready();
    test::init_service(build_app(test_state(), health)).await
}

async fn login<S, B>(app: &S, username: &str, password: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": username, "password": password }))
        .to_request();
    let res = test::call_service(app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    body["token"].as_str().expect("token string").to_owned()
}

fn authed(method: test::TestRequest, uri: &str, token: &str) -> Request {
    method
        .uri(uri)
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .to_request()
}

#[actix_web::test]
async fn health_probes_require_no_token() {
    let app = spawn_app().await;

    let res = test::call_service(&app, test::TestRequest::get().uri("/health/live").to_request())
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = test::call_service(
        &app,
        test::TestRequest::get().uri("/health/ready").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn readiness_reports_unavailable_before_startup_completes() {
    let app = test::init_service(build_app(test_state(), web::Data::new(HealthState::new())))
        .await;
    let res = test::call_service(
        &app,
        test::TestRequest::get().uri("/health/ready").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn login_issues_a_bearer_token() {
    let app = spawn_app().await;
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "admin", "password": "admin-pw" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert!(!body["token"].as_str().expect("token").is_empty());
    assert!(body["expiresAt"].is_string());
}

#[actix_web::test]
async fn login_with_wrong_credentials_is_unauthorized() {
    let app = spawn_app().await;
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "admin", "password": "wrong" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "unauthorized");
}

#[actix_web::test]
async fn login_with_a_blank_username_is_invalid() {
    let app = spawn_app().await;
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "username": "   ", "password": "admin-pw" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn api_routes_reject_missing_and_garbage_tokens() {
    let app = spawn_app().await;

    let res = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/authors").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = test::call_service(
        &app,
        authed(test::TestRequest::get(), "/api/v1/authors", "garbage"),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn expired_tokens_are_rejected() {
    let app = spawn_app().await;
    let issued_at = Utc::now() - Duration::hours(2);
    let claims = Claims {
        sub: 1,
        roles: vec!["Admin".into()],
        iss: ISSUER.into(),
        aud: AUDIENCE.into(),
        exp: (issued_at + Duration::hours(1)).timestamp(),
        iat: issued_at.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode");

    let res = test::call_service(&app, authed(test::TestRequest::get(), "/api/v1/authors", &token))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn readers_can_list_but_not_mutate() {
    let app = spawn_app().await;
    let token = login(&app, "reader", "reader-pw").await;

    let res = test::call_service(&app, authed(test::TestRequest::get(), "/api/v1/authors", &token))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = authed(
        test::TestRequest::post()
            .set_json(json!({ "firstName": "Jane", "lastName": "Austen" })),
        "/api/v1/authors",
        &token,
    );
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "forbidden");
}

#[actix_web::test]
async fn authors_support_full_crud() {
    let app = spawn_app().await;
    let token = login(&app, "admin", "admin-pw").await;

    let req = authed(
        test::TestRequest::post().set_json(json!({
            "firstName": "Jane",
            "lastName": "Austen",
            "bio": "English novelist"
        })),
        "/api/v1/authors",
        &token,
    );
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(res).await;
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["firstName"], "Jane");

    let res = test::call_service(
        &app,
        authed(test::TestRequest::get(), &format!("/api/v1/authors/{id}"), &token),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = authed(
        test::TestRequest::put().set_json(json!({
            "firstName": "Jane",
            "lastName": "Doe"
        })),
        &format!("/api/v1/authors/{id}"),
        &token,
    );
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(res).await;
    assert_eq!(updated["lastName"], "Doe");
    assert_eq!(updated["bio"], Value::Null, "update overwrites all fields");

    let res = test::call_service(
        &app,
        authed(test::TestRequest::delete(), &format!("/api/v1/authors/{id}"), &token),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = test::call_service(
        &app,
        authed(test::TestRequest::get(), &format!("/api/v1/authors/{id}"), &token),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn author_creation_validates_the_payload() {
    let app = spawn_app().await;
    let token = login(&app, "admin", "admin-pw").await;

    let req = authed(
        test::TestRequest::post()
            .set_json(json!({ "firstName": "   ", "lastName": "Austen" })),
        "/api/v1/authors",
        &token,
    );
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "invalid_request");
}

#[actix_web::test]
async fn books_filter_by_author_and_guard_references() {
    let app = spawn_app().await;
    let token = login(&app, "admin", "admin-pw").await;

    let mut author_ids = Vec::new();
    for (first, last) in [("Jane", "Austen"), ("Mary", "Shelley")] {
        let req = authed(
            test::TestRequest::post()
                .set_json(json!({ "firstName": first, "lastName": last })),
            "/api/v1/authors",
            &token,
        );
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(res).await;
        author_ids.push(created["id"].as_i64().expect("id"));
    }

    for (title, author_id) in [("Emma", author_ids[0]), ("Frankenstein", author_ids[1])] {
        let req = authed(
            test::TestRequest::post()
                .set_json(json!({ "title": title, "authorId": author_id })),
            "/api/v1/books",
            &token,
        );
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = test::call_service(
        &app,
        authed(
            test::TestRequest::get(),
            &format!("/api/v1/books?authorId={}", author_ids[1]),
            &token,
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let listed: Value = test::read_body_json(res).await;
    let listed = listed.as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Frankenstein");

    // The referenced author must not be deletable.
    let res = test::call_service(
        &app,
        authed(
            test::TestRequest::delete(),
            &format!("/api/v1/authors/{}", author_ids[0]),
            &token,
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "conflict");
}

#[actix_web::test]
async fn creating_a_book_for_a_missing_author_conflicts() {
    let app = spawn_app().await;
    let token = login(&app, "admin", "admin-pw").await;

    let req = authed(
        test::TestRequest::post()
            .set_json(json!({ "title": "Orphan", "authorId": 9999 })),
        "/api/v1/books",
        &token,
    );
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}
