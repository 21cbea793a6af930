use axum::extract::State;
use chrono::NaiveDate;
use pulse_core::goal::{self, GoalInput, GoalReview, GoalState, WeeklyGoal};
use serde::Serialize;

use super::{blocking, ok, ApiResult};
use crate::extract::{ApiJson, Caller};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CurrentGoal {
    pub week_start_date: NaiveDate,
    pub state: GoalState,
    pub goal: Option<WeeklyGoal>,
}

/// GET /api/goals/current — `goal` is null when none is set this week.
pub async fn get_current(State(app): State<AppState>, Caller(caller): Caller) -> ApiResult<CurrentGoal> {
    let today = app.clock.today();
    let goal = blocking(move || goal::current_goal(app.store.as_ref(), caller.id, today)).await?;
    ok(CurrentGoal {
        week_start_date: goal::week_start(today),
        state: goal::state_of(goal.as_ref()),
        goal,
    })
}

/// PUT /api/goals/current
pub async fn set_current(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiJson(input): ApiJson<GoalInput>,
) -> ApiResult<WeeklyGoal> {
    let today = app.clock.today();
    let goal = blocking(move || goal::set_current_goal(app.store.as_ref(), caller.id, today, input)).await?;
    ok(goal)
}

/// POST /api/goals/review
pub async fn review(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiJson(review): ApiJson<GoalReview>,
) -> ApiResult<WeeklyGoal> {
    let goal = blocking(move || goal::review_goal(app.store.as_ref(), caller.id, review)).await?;
    ok(goal)
}
