use axum::extract::State;
use pulse_core::entry::{self, DailyEntry, EntryInput};

use super::{blocking, ok, ApiResult};
use crate::extract::{ApiJson, Caller};
use crate::state::AppState;

/// POST /api/entries — upsert the caller's entry for a date (default today).
pub async fn record_entry(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiJson(input): ApiJson<EntryInput>,
) -> ApiResult<DailyEntry> {
    let today = app.clock.today();
    let stored = blocking(move || entry::record_entry(app.store.as_ref(), caller.id, input, today)).await?;
    ok(stored)
}
