//! Composition root: wires the store, gateway, and HTTP surface.

pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::{AppState, ROLE_ADMIN, auth, authors, books, health};
use crate::domain::ports::BookstoreStore;
use crate::domain::AuthGateway;
use crate::middleware::BearerAuth;
use crate::outbound::identity::InMemoryIdentityStore;
use crate::outbound::persistence::{MemoryStore, PgStore};

pub use config::ServerConfig;

/// Assemble the application: permissive CORS, health probes outside the
/// authenticated scope, and every `/api/v1` route behind the bearer
/// middleware.
pub fn build_app<S>(
    state: AppState<S>,
    health_state: web::Data<HealthState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
>
where
    S: BookstoreStore + 'static,
{
    let gateway = Arc::clone(&state.gateway);
    App::new()
        .wrap(Cors::permissive())
        .app_data(web::Data::new(state))
        .app_data(health_state)
        .route("/health/live", web::get().to(health::live))
        .route("/health/ready", web::get().to(health::ready))
        .service(
            web::scope("/api/v1")
                .wrap(BearerAuth::new(gateway))
                .route("/auth/login", web::post().to(auth::login::<S>))
                .route("/authors", web::get().to(authors::list::<S>))
                .route("/authors", web::post().to(authors::create::<S>))
                .route("/authors/{id}", web::get().to(authors::get::<S>))
                .route("/authors/{id}", web::put().to(authors::update::<S>))
                .route("/authors/{id}", web::delete().to(authors::delete::<S>))
                .route("/books", web::get().to(books::list::<S>))
                .route("/books", web::post().to(books::create::<S>))
                .route("/books/{id}", web::get().to(books::get::<S>))
                .route("/books/{id}", web::put().to(books::update::<S>))
                .route("/books/{id}", web::delete().to(books::delete::<S>)),
        )
}

/// Bind and run the server over a concrete store.
async fn serve<S>(
    store: Arc<S>,
    gateway: Arc<AuthGateway>,
    bind_addr: SocketAddr,
) -> std::io::Result<()>
where
    S: BookstoreStore + 'static,
{
    let health_state = web::Data::new(HealthState::new());
    let state = AppState::new(store, gateway);
    let server = {
        let health_state = health_state.clone();
        HttpServer::new(move || build_app(state.clone(), health_state.clone()))
            .bind(bind_addr)?
            .run()
    };
    health_state.mark_ready();
    info!(%bind_addr, "listening");
    server.await
}

/// Boot from configuration: seed the identity adapter, pick the store,
/// and serve until shutdown.
///
/// # Errors
/// Fails when the database is unreachable, a migration fails, or the
/// listener cannot bind.
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let identity = InMemoryIdentityStore::new()
        .with_user(
            1,
            config.admin_username.clone(),
            &config.admin_password,
            vec![ROLE_ADMIN.into()],
        )
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    let gateway = Arc::new(AuthGateway::new(Arc::new(identity), config.token.clone()));

    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            store
                .migrate()
                .await
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            info!("using the PostgreSQL store");
            serve(Arc::new(store), gateway, config.bind_addr).await
        }
        None => {
            warn!("DATABASE_URL not set; data lives in memory and dies with the process");
            serve(Arc::new(MemoryStore::new()), gateway, config.bind_addr).await
        }
    }
}
