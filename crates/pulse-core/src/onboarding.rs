//! Onboarding heuristics.
//!
//! Two independent predicates used by different call sites:
//!
//! - [`needs_onboarding`] asks "should we prompt now?": first-time users and
//!   everyone from day 28 of the month (to refresh monthly targets).
//! - [`onboarding_complete`] asks "is the profile filled in?": positive
//!   targets plus a real name and team.
//!
//! They are not negations of each other. A complete profile on the 28th
//! still needs onboarding.

use crate::error::{PulseError, Result};
use crate::store::RecordStore;
use crate::user::{PersonalTargets, User, DEFAULT_DISPLAY_NAME, DEFAULT_TEAM_NAME};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const MONTH_END_DAY: u32 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OnboardingStatus {
    pub needs_onboarding: bool,
    pub is_first_time: bool,
    pub is_month_end: bool,
}

pub fn is_first_time(user: &User) -> bool {
    user.personal_targets.is_empty()
}

/// Day 28 onward; short months get no special treatment.
pub fn is_month_end(today: NaiveDate) -> bool {
    today.day() >= MONTH_END_DAY
}

pub fn needs_onboarding(user: &User, today: NaiveDate) -> OnboardingStatus {
    let is_first_time = is_first_time(user);
    let is_month_end = is_month_end(today);
    OnboardingStatus {
        needs_onboarding: is_first_time || is_month_end,
        is_first_time,
        is_month_end,
    }
}

pub fn has_personal_targets(user: &User) -> bool {
    user.personal_targets.any_positive()
}

fn is_real(value: &str, placeholder: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && v != placeholder
}

pub fn has_basic_info(user: &User) -> bool {
    is_real(&user.display_name, DEFAULT_DISPLAY_NAME) && is_real(&user.team_name, DEFAULT_TEAM_NAME)
}

pub fn onboarding_complete(user: &User) -> bool {
    has_personal_targets(user) && has_basic_info(user)
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingInput {
    pub display_name: String,
    pub team_name: String,
    #[serde(default)]
    pub team_id: Option<String>,
    pub personal_targets: PersonalTargets,
}

/// Self-service profile completion: name, team and targets in one write.
pub fn complete_onboarding(store: &dyn RecordStore, user: &User, input: OnboardingInput) -> Result<User> {
    if input.display_name.trim().is_empty() {
        return Err(PulseError::validation("display_name is required"));
    }
    if input.team_name.trim().is_empty() {
        return Err(PulseError::validation("team_name is required"));
    }
    let mut updated = user.clone();
    updated.display_name = input.display_name.trim().to_string();
    updated.team_name = input.team_name.trim().to_string();
    if let Some(team_id) = input.team_id.filter(|t| !t.trim().is_empty()) {
        updated.team_id = Some(team_id);
    }
    updated.personal_targets = input.personal_targets;
    updated.updated_at = Utc::now();
    if !store.update_user(&updated)? {
        return Err(PulseError::UserNotFound(user.id.to_string()));
    }
    tracing::info!(user = %updated.id, complete = onboarding_complete(&updated), "onboarding submitted");
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
