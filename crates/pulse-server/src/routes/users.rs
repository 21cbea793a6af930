use axum::extract::State;
use pulse_core::entry::DailyEntry;
use pulse_core::goal::{self, WeeklyGoal};
use pulse_core::policy;
use pulse_core::reflection::Reflection;
use pulse_core::store::RecordStore;
use pulse_core::targets::{self, MonthlyReport, Progress, TargetsUpdate};
use pulse_core::user::User;
use uuid::Uuid;

use super::{blocking, ok, ApiResult, LimitQuery, RangeQuery};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Caller};
use crate::state::AppState;

/// GET /api/users/{id}
pub async fn get_user(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<User> {
    let user = blocking(move || policy::authorize_user(app.store.as_ref(), &caller, id)).await?;
    ok(user)
}

/// PUT /api/users/{id}/targets — the user, their leaders, or an admin.
pub async fn update_targets(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<TargetsUpdate>,
) -> ApiResult<User> {
    let user = blocking(move || targets::update_targets(app.store.as_ref(), &caller, id, update)).await?;
    ok(user)
}

/// GET /api/users/{id}/targets/monthly — 22-day projection and consistency
/// against stored monthly targets.
pub async fn monthly_targets(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<MonthlyReport> {
    let report = blocking(move || {
        let user = policy::authorize_user(app.store.as_ref(), &caller, id)?;
        Ok(targets::monthly_report(&user))
    })
    .await?;
    ok(report)
}

/// GET /api/users/{id}/progress?from&to
pub async fn progress(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ApiResult<Progress> {
    let today = app.clock.today();
    let progress = blocking(move || {
        let range = query.range(today)?;
        let user = policy::authorize_user(app.store.as_ref(), &caller, id)?;
        targets::user_progress(app.store.as_ref(), &user, range)
    })
    .await?;
    ok(progress)
}

/// GET /api/users/{id}/entries?from&to&limit — newest first.
pub async fn list_entries(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ApiResult<Vec<DailyEntry>> {
    let today = app.clock.today();
    let entries = blocking(move || {
        let range = query.range(today)?;
        let user = policy::authorize_user(app.store.as_ref(), &caller, id)?;
        app.store.list_entries(&[user.id], range, query.limit())
    })
    .await?;
    ok(entries)
}

/// GET /api/users/{id}/goals?limit — newest week first.
pub async fn list_goals(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Vec<WeeklyGoal>> {
    let goals = blocking(move || {
        let user = policy::authorize_user(app.store.as_ref(), &caller, id)?;
        goal::goal_history(app.store.as_ref(), user.id, query.limit())
    })
    .await?;
    ok(goals)
}

/// GET /api/users/{id}/reflections?limit — newest first.
pub async fn list_reflections(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Vec<Reflection>> {
    let reflections = blocking(move || {
        let user = policy::authorize_user(app.store.as_ref(), &caller, id)?;
        app.store.list_reflections(user.id, query.limit())
    })
    .await?;
    ok(reflections)
}
