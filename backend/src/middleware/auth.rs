//! Bearer-token middleware gating every non-public route.
//!
//! Requests targeting a public route pass straight through. Everything
//! else must carry `Authorization: Bearer <token>`; the gateway validates
//! the token before any handler or service logic runs, and the resulting
//! [`Principal`] is stored in the request extensions for handlers to
//! extract. Role checks stay in the handlers because they differ per
//! route.

use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, HttpMessage, HttpRequest, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::debug;

use crate::api::error::ApiError;
use crate::domain::{AuthGateway, Principal};

/// Routes reachable without a token. Health probes live outside the
/// wrapped scope and never hit this middleware.
const PUBLIC_ROUTES: &[&str] = &["/api/v1/auth/login"];

fn is_public(path: &str) -> bool {
    PUBLIC_ROUTES.contains(&path)
}

/// Extract the bearer token from the `Authorization` header.
fn bearer_token(req: &ServiceRequest) -> Result<&str, ApiError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    let as_str = header_value
        .to_str()
        .map_err(|_| ApiError::unauthorized("malformed authorization header"))?;
    as_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("authorization header is not a bearer token"))
}

/// Middleware factory validating bearer tokens through the auth gateway.
pub struct BearerAuth {
    gateway: Arc<AuthGateway>,
}

impl BearerAuth {
    /// Construct the middleware over a shared gateway.
    #[must_use]
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self { gateway }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = BearerAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service,
            gateway: Arc::clone(&self.gateway),
        }))
    }
}

/// The per-connection service wrapping the inner route tree.
pub struct BearerAuthMiddleware<S> {
    service: S,
    gateway: Arc<AuthGateway>,
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let authenticated = bearer_token(&req)
            .and_then(|token| self.gateway.authenticate(token).map_err(ApiError::from));
        match authenticated {
            Ok(principal) => {
                req.extensions_mut().insert(principal);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(err) => {
                debug!(path = req.path(), error = %err, "request rejected by auth gateway");
                let response = err.error_response().map_into_right_body();
                Box::pin(ready(Ok(req.into_response(response))))
            }
        }
    }
}

/// Extractor handing handlers the principal the middleware validated.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl actix_web::FromRequest for Authenticated {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Principal>()
                .cloned()
                .map(Authenticated)
                .ok_or_else(|| ApiError::unauthorized("request is not authenticated").into()),
        )
    }
}
