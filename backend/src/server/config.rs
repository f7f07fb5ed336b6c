//! Server configuration resolved once at process start.

use std::env;
use std::net::SocketAddr;

use tracing::warn;

use crate::domain::TokenConfig;

/// Immutable configuration for creating the HTTP server.
///
/// Resolved from the environment in `from_env`; there is no runtime
/// reloading and no global mutable state.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,
    /// Token-signing configuration injected into the auth gateway.
    pub token: TokenConfig,
    /// PostgreSQL connection string; absent means the in-memory store.
    pub database_url: Option<String>,
    /// Login name seeded into the identity adapter with the Admin role.
    pub admin_username: String,
    /// Plaintext admin password, hashed at boot.
    pub admin_password: String,
}

impl ServerConfig {
    /// Resolve configuration from the environment.
    ///
    /// The signing secret is read from the file named by
    /// `TOKEN_SECRET_FILE`, falling back to the `TOKEN_SECRET` variable.
    /// Debug builds (or `AUTH_ALLOW_EPHEMERAL=1`) fall back further to an
    /// ephemeral secret, which invalidates all tokens on restart.
    ///
    /// # Errors
    /// Fails when a required value is missing outside development or a
    /// value does not parse.
    pub fn from_env() -> std::io::Result<Self> {
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".into())
            .parse::<SocketAddr>()
            .map_err(|err| std::io::Error::other(format!("invalid BIND_ADDR: {err}")))?;

        let secret = resolve_secret()?;
        let issuer = env::var("TOKEN_ISSUER").unwrap_or_else(|_| "bookstore-backend".into());
        let audience = env::var("TOKEN_AUDIENCE").unwrap_or_else(|_| "bookstore-clients".into());
        let ttl_secs = match env::var("TOKEN_TTL_SECS") {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|err| std::io::Error::other(format!("invalid TOKEN_TTL_SECS: {err}")))?,
            Err(_) => 3600,
        };
        let token = TokenConfig::new(secret, issuer, audience, ttl_secs)
            .map_err(|err| std::io::Error::other(err.to_string()))?;

        let admin_username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
        let admin_password = match env::var("ADMIN_PASSWORD") {
            Ok(password) => password,
            Err(_) if allow_dev_fallbacks() => {
                warn!("ADMIN_PASSWORD not set; using the development default (dev only)");
                "password".into()
            }
            Err(_) => {
                return Err(std::io::Error::other(
                    "ADMIN_PASSWORD must be set outside development",
                ));
            }
        };

        Ok(Self {
            bind_addr,
            token,
            database_url: env::var("DATABASE_URL").ok(),
            admin_username,
            admin_password,
        })
    }
}

fn allow_dev_fallbacks() -> bool {
    cfg!(debug_assertions) || env::var("AUTH_ALLOW_EPHEMERAL").ok().as_deref() == Some("1")
}

/// Signing-secret resolution mirroring the file-then-env-then-dev chain.
fn resolve_secret() -> std::io::Result<String> {
    if let Ok(path) = env::var("TOKEN_SECRET_FILE") {
        let raw = std::fs::read_to_string(&path).map_err(|err| {
            std::io::Error::other(format!("failed to read token secret at {path}: {err}"))
        })?;
        return Ok(raw.trim().to_owned());
    }
    if let Ok(secret) = env::var("TOKEN_SECRET") {
        return Ok(secret);
    }
    if allow_dev_fallbacks() {
        warn!("using an ephemeral token secret (dev only); tokens die with the process");
        return Ok(uuid::Uuid::new_v4().simple().to_string());
    }
    Err(std::io::Error::other(
        "TOKEN_SECRET_FILE or TOKEN_SECRET must be set outside development",
    ))
}
