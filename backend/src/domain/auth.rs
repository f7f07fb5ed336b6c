//! Auth gateway: token issuance, validation, and role authorisation.
//!
//! A request's trust level progresses `Unauthenticated → TokenPresented →
//! Validated → Authorized`, terminating in rejection at the first failed
//! check. The gateway is stateless after issuance: tokens carry their own
//! expiry and there is no server-side revocation list.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::error::{AuthError, DomainResult, Error};
use crate::domain::ports::IdentityStore;

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Username was missing or blank once trimmed.
    EmptyUsername,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials presented to [`AuthGateway::issue_token`].
///
/// ## Invariants
/// - `username` is trimmed and must not be empty after trimming.
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace to avoid surprising credential comparisons.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw username/password inputs.
    ///
    /// # Errors
    /// Fails when the username is blank once trimmed or the password is
    /// empty.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalized = username.trim();
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyUsername);
        }
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            username: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Username string suitable for identity-store lookups.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Password string provided by the caller.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Authenticated identity with its role claims.
///
/// Produced only by [`AuthGateway::authenticate`]; never persisted by this
/// core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Identity-store identifier for the principal.
    pub id: i64,
    /// Role claims embedded in the presented token.
    pub roles: Vec<String>,
}

impl Principal {
    /// Whether the principal carries the given role claim.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|claim| claim == role)
    }
}

/// Claims carried inside an issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal identifier.
    pub sub: i64,
    /// Role claims granted at issuance.
    pub roles: Vec<String>,
    /// Issuer this gateway signed for.
    pub iss: String,
    /// Audience this gateway signed for.
    pub aud: String,
    /// Expiry as a Unix timestamp (seconds).
    pub exp: i64,
    /// Issued-at as a Unix timestamp (seconds).
    pub iat: i64,
}

/// A signed bearer token and its expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// Compact JWT string to present as `Authorization: Bearer <token>`.
    pub token: String,
    /// Instant after which [`AuthGateway::authenticate`] rejects the
    /// token as expired.
    pub expires_at: DateTime<Utc>,
}

/// Immutable token-signing configuration injected at process start.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    secret: String,
    issuer: String,
    audience: String,
    ttl_secs: i64,
}

impl TokenConfig {
    /// Construct and validate signing configuration.
    ///
    /// # Errors
    /// Fails with [`Error::Validation`] when the secret, issuer, or
    /// audience is blank, or the lifetime is not positive.
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl_secs: i64,
    ) -> DomainResult<Self> {
        let secret = secret.into();
        let issuer = issuer.into();
        let audience = audience.into();
        if secret.trim().is_empty() {
            return Err(Error::validation("token secret must not be blank"));
        }
        if issuer.trim().is_empty() {
            return Err(Error::validation("token issuer must not be blank"));
        }
        if audience.trim().is_empty() {
            return Err(Error::validation("token audience must not be blank"));
        }
        if ttl_secs <= 0 {
            return Err(Error::validation("token lifetime must be positive"));
        }
        Ok(Self {
            secret,
            issuer,
            audience,
            ttl_secs,
        })
    }

    /// Issuer embedded in and required of tokens.
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.issuer.as_str()
    }

    /// Audience embedded in and required of tokens.
    #[must_use]
    pub fn audience(&self) -> &str {
        self.audience.as_str()
    }
}

/// Issues signed bearer tokens and gates every request on them.
pub struct AuthGateway {
    identity: Arc<dyn IdentityStore>,
    config: TokenConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthGateway {
    /// Construct a gateway over the external identity boundary.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityStore>, config: TokenConfig) -> Self {
        let encoding = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            identity,
            config,
            encoding,
            decoding,
        }
    }

    /// Verify credentials against the identity store and issue a signed
    /// token embedding the principal's identifier and roles.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] when the username is unknown or
    /// the password hash does not verify; store failures propagate as
    /// [`Error::Store`].
    pub async fn issue_token(&self, credentials: &LoginCredentials) -> DomainResult<SignedToken> {
        let Some(record) = self
            .identity
            .find_by_username(credentials.username())
            .await?
        else {
            debug!(username = credentials.username(), "unknown principal");
            return Err(AuthError::InvalidCredentials.into());
        };
        let verified = bcrypt::verify(credentials.password(), &record.password_hash)
            .inspect_err(|err| debug!(error = %err, "password hash verification errored"))
            .unwrap_or(false);
        if !verified {
            return Err(AuthError::InvalidCredentials.into());
        }

        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::seconds(self.config.ttl_secs);
        let claims = Claims {
            sub: record.id,
            roles: record.roles,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| Error::store(format!("token signing failed: {err}")))?;
        Ok(SignedToken { token, expires_at })
    }

    /// Validate a presented token: signature, then issuer, then audience,
    /// then expiry, short-circuiting on the first failure.
    ///
    /// # Errors
    /// The [`AuthError`] subkind for the earliest failed check.
    pub fn authenticate(&self, token: &str) -> DomainResult<Principal> {
        // Issuer, audience, and expiry are checked manually below so each
        // failure maps to its own subkind; the library pass only verifies
        // the signature and shape.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            debug!(error = %err, "token rejected before claim checks");
            AuthError::BadSignature
        })?;
        let claims = data.claims;
        if claims.iss != self.config.issuer {
            return Err(AuthError::WrongIssuer.into());
        }
        if claims.aud != self.config.audience {
            return Err(AuthError::WrongAudience.into());
        }
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired.into());
        }
        Ok(Principal {
            id: claims.sub,
            roles: claims.roles,
        })
    }

    /// Pure role-set membership check; no store access.
    #[must_use]
    pub fn authorize(&self, principal: &Principal, required_role: &str) -> bool {
        principal.has_role(required_role)
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
