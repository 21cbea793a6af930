//! The Record Store seam.
//!
//! Every persistence call the core makes goes through [`RecordStore`]. Calls
//! are independent and non-transactional; two writers to the same
//! `(user_id, week_start_date)` race and the last write wins.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::entry::DailyEntry;
use crate::error::{PulseError, Result};
use crate::goal::WeeklyGoal;
use crate::questions::WeekdayQuestions;
use crate::reflection::Reflection;
use crate::targets::TeamAnalytics;
use crate::types::Role;
use crate::user::User;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Query predicates
// ---------------------------------------------------------------------------

/// Longest accepted range, in days (inclusive).
pub const MAX_RANGE_DAYS: i64 = 3_660;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(PulseError::validation(format!(
                "date range start {from} is after end {to}"
            )));
        }
        let span = to.signed_duration_since(from).num_days() + 1;
        if span > MAX_RANGE_DAYS {
            return Err(PulseError::validation(format!(
                "date range {from}..{to} spans {span} days; the maximum is {MAX_RANGE_DAYS}"
            )));
        }
        Ok(Self { from, to })
    }

    /// First of the month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        let from = today.with_day(1).unwrap_or(today);
        Self { from, to: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Number of Monday..Friday dates in the range.
    pub fn working_days(&self) -> u32 {
        let span = self.to.signed_duration_since(self.from).num_days() + 1;
        if span <= 0 {
            return 0;
        }
        let start = i64::from(self.from.weekday().num_days_from_monday());
        let partial = (0..span % 7).filter(|i| (start + i) % 7 < 5).count() as i64;
        u32::try_from(span / 7 * 5 + partial).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn team(team_id: impl Into<String>) -> Self {
        Self {
            team_id: Some(team_id.into()),
            role: None,
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.team_id
            .as_deref()
            .is_none_or(|t| user.team_id.as_deref() == Some(t))
            && self.role.is_none_or(|r| user.role == r)
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Relational persistence consumed by the core.
///
/// Single-row lookups return `Ok(None)` for absent rows; only genuine store
/// failures surface as [`PulseError::Store`].
pub trait RecordStore: Send + Sync {
    /// Apply pending schema migrations; returns the resulting schema version.
    fn migrate(&self) -> Result<u32>;
    fn schema_version(&self) -> Result<u32>;

    // Users
    fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>>;
    /// Ordered by `created_at` ascending.
    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>>;
    /// Insert `user`, or when a row with the same `external_id` exists, bump
    /// its `updated_at` / `last_sign_in_at` and leave everything else alone.
    /// Returns the stored row.
    fn upsert_user_by_external_id(&self, user: &User) -> Result<User>;
    /// Overwrite the row with `user.id`; `false` when no such row exists.
    fn update_user(&self, user: &User) -> Result<bool>;

    // Daily entries
    /// Upsert on `(user_id, entry_date)`, keeping the original `created_at`.
    fn upsert_entry(&self, entry: &DailyEntry) -> Result<DailyEntry>;
    /// Entries of any of `user_ids` within `range`, newest date first.
    fn list_entries(
        &self,
        user_ids: &[Uuid],
        range: DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<DailyEntry>>;

    // Weekly goals
    fn get_goal(&self, user_id: Uuid, week_start: NaiveDate) -> Result<Option<WeeklyGoal>>;
    /// Upsert on `(user_id, week_start_date)`. An existing row keeps its
    /// review fields and `created_at`; goal text and targets are replaced.
    fn upsert_goal(&self, goal: &WeeklyGoal) -> Result<WeeklyGoal>;
    /// Update the row matching `(user_id, week_start_date)`; `false` when
    /// none matches.
    fn update_goal(&self, goal: &WeeklyGoal) -> Result<bool>;
    /// Newest week first.
    fn list_goals(&self, user_id: Uuid, limit: usize) -> Result<Vec<WeeklyGoal>>;

    // Reflections (append-only)
    fn insert_reflection(&self, reflection: &Reflection) -> Result<()>;
    /// Newest first.
    fn list_reflections(&self, user_id: Uuid, limit: usize) -> Result<Vec<Reflection>>;

    // Weekday questions
    fn get_weekday_questions(&self, weekday: u8) -> Result<Option<WeekdayQuestions>>;
    fn put_weekday_questions(&self, questions: &WeekdayQuestions) -> Result<()>;

    /// Server-side aggregation of daily entries across a team. `None` when
    /// no entry matches.
    fn team_analytics(&self, team_id: &str, range: DateRange) -> Result<Option<TeamAnalytics>>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
