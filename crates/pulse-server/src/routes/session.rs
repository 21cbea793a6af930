use axum::body::Bytes;
use axum::extract::State;
use pulse_core::onboarding::{self, OnboardingInput, OnboardingStatus};
use pulse_core::user::User;
use serde::{Deserialize, Serialize};

use super::{blocking, ok, ApiResult};
use crate::error::AppError;
use crate::extract::{ApiJson, Caller, Subject};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct SignInBody {
    #[serde(default)]
    display_name: Option<String>,
}

/// POST /api/auth/sign-in — create the caller's user on first sign-in.
///
/// The body is optional; `{"display_name": "..."}` seeds the name of a new
/// user and is ignored for an existing one.
pub async fn sign_in(State(app): State<AppState>, Subject(subject): Subject, body: Bytes) -> ApiResult<User> {
    let body: SignInBody = if body.iter().all(u8::is_ascii_whitespace) {
        SignInBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::bad_request(e.to_string()))?
    };
    let user = blocking(move || {
        app.resolver
            .sign_in(app.store.as_ref(), subject.as_deref(), body.display_name)
    })
    .await?;
    ok(user)
}

/// GET /api/me
pub async fn me(Caller(user): Caller) -> ApiResult<User> {
    ok(user)
}

#[derive(Debug, Serialize)]
pub struct OnboardingView {
    #[serde(flatten)]
    pub status: OnboardingStatus,
    pub onboarding_complete: bool,
    pub has_personal_targets: bool,
    pub has_basic_info: bool,
}

/// GET /api/me/onboarding — both onboarding predicates for the caller.
pub async fn onboarding_status(State(app): State<AppState>, Caller(user): Caller) -> ApiResult<OnboardingView> {
    ok(OnboardingView {
        status: onboarding::needs_onboarding(&user, app.clock.today()),
        onboarding_complete: onboarding::onboarding_complete(&user),
        has_personal_targets: onboarding::has_personal_targets(&user),
        has_basic_info: onboarding::has_basic_info(&user),
    })
}

/// POST /api/me/onboarding
pub async fn complete_onboarding(
    State(app): State<AppState>,
    Caller(user): Caller,
    ApiJson(input): ApiJson<OnboardingInput>,
) -> ApiResult<User> {
    let updated = blocking(move || onboarding::complete_onboarding(app.store.as_ref(), &user, input)).await?;
    ok(updated)
}
