//! Liveness and readiness probes, outside the authenticated scope.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, web};

/// Readiness flag flipped once the server has bound its listener.
#[derive(Debug, Default)]
pub struct HealthState {
    ready: AtomicBool,
}

impl HealthState {
    /// Construct an un-ready state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the process ready to receive traffic.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Whether the process is ready to receive traffic.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// `GET /health/live`
pub async fn live() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

/// `GET /health/ready`
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    if state.is_ready() {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::ServiceUnavailable().finish()
    }
}
