use axum::extract::State;
use pulse_core::questions::{self, WeekdayQuestions};

use super::{blocking, ok, ApiResult};
use crate::extract::{ApiPath, Caller};
use crate::state::AppState;

/// GET /api/questions/today — by the server's calendar date.
pub async fn today(State(app): State<AppState>, Caller(_caller): Caller) -> ApiResult<WeekdayQuestions> {
    let weekday = questions::weekday_number(app.clock.today());
    let q = blocking(move || questions::questions_for(app.store.as_ref(), weekday)).await?;
    ok(q)
}

/// GET /api/questions/{weekday} — out-of-range or unparseable weekdays get
/// the fallback set.
pub async fn by_weekday(
    State(app): State<AppState>,
    Caller(_caller): Caller,
    ApiPath(raw): ApiPath<String>,
) -> ApiResult<WeekdayQuestions> {
    let weekday = questions::parse_weekday(&raw);
    let q = blocking(move || questions::questions_for(app.store.as_ref(), weekday)).await?;
    ok(q)
}
