use axum::extract::State;
use pulse_core::policy;
use pulse_core::targets::{self, TeamAnalytics, TeamTargets};
use pulse_core::user::User;

use super::{blocking, ok, ApiResult, RangeQuery};
use crate::extract::{ApiPath, ApiQuery, Caller};
use crate::state::AppState;

/// GET /api/team/members — the caller's transitive reports; every user for
/// an admin.
pub async fn members(State(app): State<AppState>, Caller(caller): Caller) -> ApiResult<Vec<User>> {
    let users = blocking(move || policy::visible_users(app.store.as_ref(), &caller)).await?;
    ok(users)
}

/// GET /api/team/{team_id}/analytics?from&to — `null` when the team has no
/// entries in range.
pub async fn analytics(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(team_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ApiResult<Option<TeamAnalytics>> {
    let today = app.clock.today();
    let analytics = blocking(move || {
        let range = query.range(today)?;
        targets::team_analytics(app.store.as_ref(), &caller, &team_id, range)
    })
    .await?;
    ok(analytics)
}

/// GET /api/team/{team_id}/targets — summed daily targets with weekly and
/// monthly projections.
pub async fn team_targets(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(team_id): ApiPath<String>,
) -> ApiResult<TeamTargets> {
    let rolled = blocking(move || {
        policy::authorize_team(&caller, &team_id)?;
        targets::team_targets(app.store.as_ref(), &team_id)
    })
    .await?;
    ok(rolled)
}
