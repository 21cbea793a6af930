use axum::extract::State;
use pulse_core::reflection::{self, Reflection, ReflectionInput};

use super::{blocking, ok, ApiResult};
use crate::extract::{ApiJson, Caller};
use crate::state::AppState;

/// POST /api/reflections — append-only.
pub async fn add_reflection(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiJson(input): ApiJson<ReflectionInput>,
) -> ApiResult<Reflection> {
    let stored = blocking(move || reflection::add_reflection(app.store.as_ref(), caller.id, input)).await?;
    ok(stored)
}
