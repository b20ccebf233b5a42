use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("ok" or "degraded").
    pub status: &'static str,
    /// Whether a storage backend is currently installed.
    pub storage: bool,
}

impl HealthResponse {
    /// Healthy response with storage attached.
    pub fn ok() -> Self {
        Self {
            status: "ok",
            storage: true,
        }
    }

    /// Response for degraded mode (no storage backend).
    pub fn degraded() -> Self {
        Self {
            status: "degraded",
            storage: false,
        }
    }
}
