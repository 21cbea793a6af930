//! Target Aggregator: daily targets to weekly/monthly expectations, actual
//! versus expected, and team roll-ups.

use crate::entry::{self, MetricCounts};
use crate::error::Result;
use crate::policy;
use crate::store::{DateRange, RecordStore, UserFilter};
use crate::types::Metric;
use crate::user::{MonthlyTargets, PersonalTargets, User};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const WORKING_DAYS_PER_MONTH: u32 = 22;
pub const WORKING_DAYS_PER_WEEK: u32 = 5;

fn scale(targets: &PersonalTargets, days: u32) -> BTreeMap<Metric, u32> {
    Metric::all()
        .iter()
        .map(|&m| (m, targets.get(m).saturating_mul(days)))
        .collect()
}

/// Daily targets × 22 for every metric. Missing metrics project to zero.
pub fn project_monthly(targets: &PersonalTargets) -> MonthlyTargets {
    MonthlyTargets::new(scale(targets, WORKING_DAYS_PER_MONTH))
}

/// Daily targets × 5 for every metric.
pub fn project_weekly(targets: &PersonalTargets) -> MetricCounts {
    scale(targets, WORKING_DAYS_PER_WEEK)
}

// ---------------------------------------------------------------------------
// Monthly consistency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricConsistency {
    pub metric: Metric,
    pub projected: u32,
    pub stored: Option<u32>,
    /// `None` when no monthly target is stored for the metric.
    pub consistent: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub user_id: Uuid,
    pub projected: MonthlyTargets,
    pub metrics: Vec<MetricConsistency>,
    pub all_consistent: bool,
}

/// Compare the 22-day projection against any stored monthly targets.
/// Informational only; nothing is enforced.
pub fn monthly_report(user: &User) -> MonthlyReport {
    let projected = project_monthly(&user.personal_targets);
    let metrics: Vec<MetricConsistency> = Metric::all()
        .iter()
        .map(|&m| {
            let p = projected.get(m).unwrap_or(0);
            let stored = user.monthly_targets.get(m);
            MetricConsistency {
                metric: m,
                projected: p,
                stored,
                consistent: stored.map(|s| s == p),
            }
        })
        .collect();
    let all_consistent = metrics.iter().all(|m| m.consistent != Some(false));
    MonthlyReport {
        user_id: user.id,
        projected,
        metrics,
        all_consistent,
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricProgress {
    pub metric: Metric,
    pub expected: u32,
    pub actual: u32,
    /// `None` when nothing was expected.
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub user_id: Uuid,
    pub range: DateRange,
    pub working_days: u32,
    pub metrics: Vec<MetricProgress>,
}

/// Expected counts (daily target × working days) against recorded actuals.
pub fn progress(targets: &PersonalTargets, actual: &MetricCounts, working_days: u32) -> Vec<MetricProgress> {
    Metric::all()
        .iter()
        .map(|&m| {
            let expected = targets.get(m).saturating_mul(working_days);
            let actual = actual.get(&m).copied().unwrap_or(0);
            let percent = (expected > 0).then(|| f64::from(actual) * 100.0 / f64::from(expected));
            MetricProgress {
                metric: m,
                expected,
                actual,
                percent,
            }
        })
        .collect()
}

pub fn user_progress(store: &dyn RecordStore, user: &User, range: DateRange) -> Result<Progress> {
    let entries = store.list_entries(&[user.id], range, None)?;
    let actual = entry::totals(&entries);
    let working_days = range.working_days();
    Ok(Progress {
        user_id: user.id,
        range,
        working_days,
        metrics: progress(&user.personal_targets, &actual, working_days),
    })
}

// ---------------------------------------------------------------------------
// Team roll-ups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TeamTargets {
    pub team_id: String,
    pub member_count: usize,
    pub daily: PersonalTargets,
    pub weekly: MetricCounts,
    pub monthly: MonthlyTargets,
}

/// Sum personal targets across `users`. Users without targets add zero.
pub fn roll_up(team_id: impl Into<String>, users: &[User]) -> TeamTargets {
    let mut daily = PersonalTargets::default();
    for &m in Metric::all() {
        let sum = users
            .iter()
            .fold(0u32, |acc, u| acc.saturating_add(u.personal_targets.get(m)));
        daily.set(m, sum);
    }
    TeamTargets {
        team_id: team_id.into(),
        member_count: users.len(),
        weekly: project_weekly(&daily),
        monthly: project_monthly(&daily),
        daily,
    }
}

pub fn team_targets(store: &dyn RecordStore, team_id: &str) -> Result<TeamTargets> {
    let users = store.list_users(&UserFilter::team(team_id))?;
    Ok(roll_up(team_id, &users))
}

// ---------------------------------------------------------------------------
// Team analytics
// ---------------------------------------------------------------------------

/// Aggregated actuals for one team over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalytics {
    pub team_id: String,
    pub range: DateRange,
    /// Distinct users with at least one entry in range.
    pub member_count: u32,
    pub entry_count: u32,
    pub totals: MetricCounts,
    /// Per-entry averages.
    pub averages: BTreeMap<Metric, f64>,
}

impl TeamAnalytics {
    /// `None` when `entry_count` is zero.
    pub fn from_totals(
        team_id: impl Into<String>,
        range: DateRange,
        member_count: u32,
        entry_count: u32,
        totals: MetricCounts,
    ) -> Option<Self> {
        if entry_count == 0 {
            return None;
        }
        let averages = Metric::all()
            .iter()
            .map(|&m| {
                let total = totals.get(&m).copied().unwrap_or(0);
                (m, f64::from(total) / f64::from(entry_count))
            })
            .collect();
        Some(Self {
            team_id: team_id.into(),
            range,
            member_count,
            entry_count,
            totals,
            averages,
        })
    }
}

/// Server-side team aggregation, gated by the team scope of `requester`.
pub fn team_analytics(
    store: &dyn RecordStore,
    requester: &User,
    team_id: &str,
    range: DateRange,
) -> Result<Option<TeamAnalytics>> {
    policy::authorize_team(requester, team_id)?;
    store.team_analytics(team_id, range)
}

// ---------------------------------------------------------------------------
// Target updates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TargetsUpdate {
    pub personal_targets: PersonalTargets,
    #[serde(default)]
    pub monthly_targets: Option<MonthlyTargets>,
}

/// Replace a user's targets. Allowed for the user, their leaders and admins.
pub fn update_targets(
    store: &dyn RecordStore,
    requester: &User,
    target: Uuid,
    update: TargetsUpdate,
) -> Result<User> {
    let mut user = policy::authorize_user(store, requester, target)?;
    user.personal_targets = update.personal_targets;
    if let Some(monthly) = update.monthly_targets {
        user.monthly_targets = monthly;
    }
    user.updated_at = chrono::Utc::now();
    if !store.update_user(&user)? {
        return Err(crate::error::PulseError::UserNotFound(target.to_string()));
    }
    tracing::info!(by = %requester.id, user = %user.id, "personal targets updated");
    Ok(user)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
