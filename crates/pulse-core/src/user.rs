use crate::error::{PulseError, Result};
use crate::types::{Metric, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const DEFAULT_DISPLAY_NAME: &str = "Test User";
pub const DEFAULT_TEAM_NAME: &str = "Test Team";

// ---------------------------------------------------------------------------
// Target maps
// ---------------------------------------------------------------------------

fn parse_suffixed(raw: BTreeMap<String, u32>, suffix: &str) -> Result<BTreeMap<Metric, u32>> {
    raw.into_iter()
        .map(|(k, v)| Ok((Metric::from_suffixed(&k, suffix)?, v)))
        .collect()
}

fn render_suffixed(map: &BTreeMap<Metric, u32>, suffix: &str) -> BTreeMap<String, u32> {
    map.iter()
        .map(|(m, v)| (format!("{}{}", m.as_str(), suffix), *v))
        .collect()
}

/// Per-user daily targets. Serialized as `{"fa_daily": 5, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")]
pub struct PersonalTargets(BTreeMap<Metric, u32>);

impl PersonalTargets {
    pub fn new(map: BTreeMap<Metric, u32>) -> Self {
        Self(map)
    }

    /// The fixed baseline seeded on first sign-in.
    pub fn baseline() -> Self {
        Self(
            Metric::all()
                .iter()
                .map(|&m| (m, m.default_daily_target()))
                .collect(),
        )
    }

    /// Daily target for `metric`; absent metrics count as zero.
    pub fn get(&self, metric: Metric) -> u32 {
        self.0.get(&metric).copied().unwrap_or(0)
    }

    pub fn set(&mut self, metric: Metric, value: u32) {
        self.0.insert(metric, value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn any_positive(&self) -> bool {
        self.0.values().any(|&v| v > 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, u32)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }
}

impl TryFrom<BTreeMap<String, u32>> for PersonalTargets {
    type Error = PulseError;

    fn try_from(raw: BTreeMap<String, u32>) -> Result<Self> {
        parse_suffixed(raw, "_daily").map(Self)
    }
}

impl From<PersonalTargets> for BTreeMap<String, u32> {
    fn from(t: PersonalTargets) -> Self {
        render_suffixed(&t.0, "_daily")
    }
}

/// Monthly targets. Serialized as `{"fa_monthly": 110, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")]
pub struct MonthlyTargets(BTreeMap<Metric, u32>);

impl MonthlyTargets {
    pub fn new(map: BTreeMap<Metric, u32>) -> Self {
        Self(map)
    }

    pub fn get(&self, metric: Metric) -> Option<u32> {
        self.0.get(&metric).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, u32)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }
}

impl TryFrom<BTreeMap<String, u32>> for MonthlyTargets {
    type Error = PulseError;

    fn try_from(raw: BTreeMap<String, u32>) -> Result<Self> {
        parse_suffixed(raw, "_monthly").map(Self)
    }
}

impl From<MonthlyTargets> for BTreeMap<String, u32> {
    fn from(t: MonthlyTargets) -> Self {
        render_suffixed(&t.0, "_monthly")
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub display_name: String,
    pub role: Role,
    pub team_name: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub parent_leader_id: Option<Uuid>,
    #[serde(default)]
    pub personal_targets: PersonalTargets,
    #[serde(default, skip_serializing_if = "MonthlyTargets::is_empty")]
    pub monthly_targets: MonthlyTargets,
    pub is_team_leader: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl User {
    /// A freshly seeded user as created on first sign-in.
    pub fn seeded(external_id: impl Into<String>, display_name: Option<String>) -> Self {
        let now = Utc::now();
        let role = Role::Advisor;
        Self {
            id: Uuid::new_v4(),
            external_id: external_id.into(),
            display_name: display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            role,
            team_name: DEFAULT_TEAM_NAME.to_string(),
            team_id: None,
            parent_leader_id: None,
            personal_targets: PersonalTargets::baseline(),
            monthly_targets: MonthlyTargets::default(),
            is_team_leader: role.implies_team_leader(),
            created_at: now,
            updated_at: now,
            last_sign_in_at: Some(now),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this user may act as someone's `parent_leader_id` and see
    /// their reports' records.
    pub fn can_lead(&self) -> bool {
        match self.role {
            Role::Admin | Role::TeamLeader | Role::SubLeader => true,
            Role::Advisor | Role::Trainee | Role::Fuehrungskraft => self.is_team_leader,
        }
    }

    /// Change the role, re-deriving the cached leader flag unless an explicit
    /// override is supplied.
    pub fn set_role(&mut self, role: Role, leader_override: Option<bool>) {
        self.role = role;
        self.is_team_leader = leader_override.unwrap_or_else(|| role.implies_team_leader());
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_targets_serialize_with_daily_suffix() {
        let json = serde_json::to_value(PersonalTargets::baseline()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "fa_daily": 5,
                "eh_daily": 3,
                "new_appointments_daily": 3,
                "recommendations_daily": 2,
                "tiv_invitations_daily": 2,
                "taa_invitations_daily": 1,
                "tgs_registrations_daily": 1,
                "bav_checks_daily": 2,
            })
        );
    }

    #[test]
    fn targets_reject_unknown_metric() {
        let err = serde_json::from_value::<PersonalTargets>(serde_json::json!({"calls_daily": 4}));
        assert!(err.is_err());
    }

    #[test]
    fn targets_reject_negative_values() {
        let err = serde_json::from_value::<PersonalTargets>(serde_json::json!({"fa_daily": -1}));
        assert!(err.is_err());
    }

    #[test]
    fn missing_metric_reads_as_zero() {
        let targets = PersonalTargets::default();
        assert_eq!(targets.get(Metric::Fa), 0);
        assert!(!targets.any_positive());
    }

    #[test]
    fn seeded_user_defaults() {
        let user = User::seeded("ext_1", None);
        assert_eq!(user.display_name, DEFAULT_DISPLAY_NAME);
        assert_eq!(user.team_name, DEFAULT_TEAM_NAME);
        assert_eq!(user.role, Role::Advisor);
        assert!(!user.is_team_leader);
        assert_eq!(user.personal_targets, PersonalTargets::baseline());
    }

    #[test]
    fn seeded_user_ignores_blank_name() {
        let user = User::seeded("ext_1", Some("  ".into()));
        assert_eq!(user.display_name, DEFAULT_DISPLAY_NAME);
    }

    #[test]
    fn trainee_can_lead_only_with_flag() {
        let mut user = User::seeded("ext_1", None);
        user.set_role(Role::Trainee, None);
        assert!(!user.can_lead());
        user.set_role(Role::Trainee, Some(true));
        assert!(user.can_lead());
    }

    #[test]
    fn role_change_rederives_flag() {
        let mut user = User::seeded("ext_1", None);
        user.set_role(Role::TeamLeader, None);
        assert!(user.is_team_leader);
        user.set_role(Role::Advisor, None);
        assert!(!user.is_team_leader);
    }
}
