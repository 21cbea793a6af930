use serde::Serialize;

use super::{ok, ApiResult};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health — unauthenticated liveness.
pub async fn health() -> ApiResult<Health> {
    ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
