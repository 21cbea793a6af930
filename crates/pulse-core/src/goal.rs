//! Weekly goal lifecycle.
//!
//! A goal lives at `(user_id, week_start_date)` and moves
//! `NoGoal -> Active -> Reviewed`. Setting a goal for the current week creates
//! it; submitting a review for an existing week marks it reviewed. Re-review
//! overwrites the previous review values and keeps no history.

use crate::entry::MetricCounts;
use crate::error::{PulseError, Result};
use crate::store::RecordStore;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Week arithmetic
// ---------------------------------------------------------------------------

/// The Monday on or before `date`.
///
/// With weekday numbered Monday=1..Sunday=7: Sunday steps back 6 days, every
/// other day steps back `weekday - 1` days. This is the only week-boundary
/// computation in the crate.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let weekday = date.weekday().number_from_monday() as i64;
    let back = if weekday == 7 { 6 } else { weekday - 1 };
    date - Duration::days(back)
}

pub fn is_week_start(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

// ---------------------------------------------------------------------------
// WeeklyGoal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalState {
    NoGoal,
    Active,
    Reviewed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyGoal {
    pub user_id: Uuid,
    pub week_start_date: NaiveDate,
    pub goal_text: String,
    #[serde(default)]
    pub targets: MetricCounts,
    pub is_completed: bool,
    #[serde(default)]
    pub completion_notes: Option<String>,
    #[serde(default)]
    pub next_week_focus: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WeeklyGoal {
    pub fn state(&self) -> GoalState {
        if self.reviewed_at.is_some() {
            GoalState::Reviewed
        } else {
            GoalState::Active
        }
    }
}

pub fn state_of(goal: Option<&WeeklyGoal>) -> GoalState {
    goal.map_or(GoalState::NoGoal, WeeklyGoal::state)
}

/// Payload for setting the current week's goal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalInput {
    pub goal_text: String,
    #[serde(default)]
    pub targets: MetricCounts,
}

/// Payload for the weekly review step.
#[derive(Debug, Clone, Deserialize)]
pub struct GoalReview {
    pub week_start_date: NaiveDate,
    pub goal_achieved: bool,
    #[serde(default)]
    pub completion_notes: Option<String>,
    #[serde(default)]
    pub next_week_focus: Option<String>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// The goal for the week containing `today`, if one has been set.
pub fn current_goal(
    store: &dyn RecordStore,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Option<WeeklyGoal>> {
    store.get_goal(user_id, week_start(today))
}

/// Create or replace the goal text and targets for the week containing
/// `today` (`NoGoal -> Active`). An existing review is kept.
pub fn set_current_goal(
    store: &dyn RecordStore,
    user_id: Uuid,
    today: NaiveDate,
    input: GoalInput,
) -> Result<WeeklyGoal> {
    if input.goal_text.trim().is_empty() {
        return Err(PulseError::validation("goal_text is required"));
    }
    let now = Utc::now();
    let goal = WeeklyGoal {
        user_id,
        week_start_date: week_start(today),
        goal_text: input.goal_text,
        targets: input.targets,
        is_completed: false,
        completion_notes: None,
        next_week_focus: None,
        reviewed_at: None,
        created_at: now,
        updated_at: now,
    };
    let stored = store.upsert_goal(&goal)?;
    tracing::info!(%user_id, week = %stored.week_start_date, "weekly goal set");
    Ok(stored)
}

/// Record the review for `review.week_start_date` (`Active -> Reviewed`).
///
/// Never creates a row: a week with no goal is `GoalNotFound`.
pub fn review_goal(
    store: &dyn RecordStore,
    user_id: Uuid,
    review: GoalReview,
) -> Result<WeeklyGoal> {
    if !is_week_start(review.week_start_date) {
        return Err(PulseError::validation(format!(
            "week_start_date {} is not a Monday",
            review.week_start_date
        )));
    }
    let mut goal = store
        .get_goal(user_id, review.week_start_date)?
        .ok_or_else(|| PulseError::GoalNotFound {
            user_id: user_id.to_string(),
            week_start: review.week_start_date,
        })?;

    if goal.state() == GoalState::Reviewed {
        tracing::debug!(%user_id, week = %goal.week_start_date, "overwriting previous review");
    }

    let now = Utc::now();
    goal.is_completed = review.goal_achieved;
    goal.completion_notes = review.completion_notes;
    goal.next_week_focus = review.next_week_focus;
    goal.reviewed_at = Some(now);
    goal.updated_at = now;

    if !store.update_goal(&goal)? {
        // Row vanished between read and write.
        return Err(PulseError::GoalNotFound {
            user_id: user_id.to_string(),
            week_start: goal.week_start_date,
        });
    }
    tracing::info!(%user_id, week = %goal.week_start_date, achieved = goal.is_completed, "weekly goal reviewed");
    Ok(goal)
}

pub fn goal_history(store: &dyn RecordStore, user_id: Uuid, limit: usize) -> Result<Vec<WeeklyGoal>> {
    store.list_goals(user_id, limit)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
