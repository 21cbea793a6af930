use axum::extract::State;
use pulse_core::admin::{self, LeaderAssignment, RoleChange};
use pulse_core::policy;
use pulse_core::questions::{self, WeekdayQuestions};
use pulse_core::store::{RecordStore, UserFilter};
use pulse_core::user::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{blocking, ok, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Caller};
use crate::state::AppState;

/// GET /api/admin/users?team_id&role
pub async fn list_users(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> ApiResult<Vec<User>> {
    let users = blocking(move || admin::list_users(app.store.as_ref(), &caller, &filter)).await?;
    ok(users)
}

/// PUT /api/admin/users/{id}/role
pub async fn change_role(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(change): ApiJson<RoleChange>,
) -> ApiResult<User> {
    let user = blocking(move || admin::change_role(app.store.as_ref(), &caller, id, change)).await?;
    ok(user)
}

/// PUT /api/admin/users/{id}/leader — `{"leader_id": null}` clears it.
pub async fn assign_leader(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(assignment): ApiJson<LeaderAssignment>,
) -> ApiResult<User> {
    let user = blocking(move || admin::assign_leader(app.store.as_ref(), &caller, id, assignment)).await?;
    ok(user)
}

#[derive(Debug, Deserialize)]
pub struct QuestionsBody {
    pub yesterday_question: String,
    pub today_questions: Vec<String>,
    pub trainee_question: String,
}

/// PUT /api/admin/questions/{weekday}
pub async fn put_questions(
    State(app): State<AppState>,
    Caller(caller): Caller,
    ApiPath(weekday): ApiPath<u8>,
    ApiJson(body): ApiJson<QuestionsBody>,
) -> ApiResult<WeekdayQuestions> {
    let stored = blocking(move || {
        policy::require_admin(&caller)?;
        questions::replace_questions(
            app.store.as_ref(),
            WeekdayQuestions {
                weekday,
                yesterday_question: body.yesterday_question,
                today_questions: body.today_questions,
                trainee_question: body.trainee_question,
                is_fallback: false,
            },
        )
    })
    .await?;
    ok(stored)
}

#[derive(Debug, Serialize)]
pub struct MigrationReport {
    pub previous_version: u32,
    pub schema_version: u32,
}

/// POST /api/admin/maintenance/migrate
pub async fn migrate(State(app): State<AppState>, Caller(caller): Caller) -> ApiResult<MigrationReport> {
    let report = blocking(move || {
        policy::require_admin(&caller)?;
        let previous_version = app.store.schema_version()?;
        let schema_version = app.store.migrate()?;
        tracing::info!(by = %caller.id, previous_version, schema_version, "migration requested");
        Ok(MigrationReport {
            previous_version,
            schema_version,
        })
    })
    .await?;
    ok(report)
}
