use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Advisor,
    SubLeader,
    TeamLeader,
    Admin,
    Trainee,
    #[serde(rename = "führungskraft", alias = "fuehrungskraft")]
    Fuehrungskraft,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[
            Role::Advisor,
            Role::SubLeader,
            Role::TeamLeader,
            Role::Admin,
            Role::Trainee,
            Role::Fuehrungskraft,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Advisor => "advisor",
            Role::SubLeader => "sub_leader",
            Role::TeamLeader => "team_leader",
            Role::Admin => "admin",
            Role::Trainee => "trainee",
            Role::Fuehrungskraft => "führungskraft",
        }
    }

    /// Value of the cached `is_team_leader` flag implied by this role.
    pub fn implies_team_leader(self) -> bool {
        match self {
            Role::TeamLeader | Role::SubLeader | Role::Admin => true,
            Role::Advisor | Role::Trainee | Role::Fuehrungskraft => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = crate::error::PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advisor" => Ok(Role::Advisor),
            "sub_leader" => Ok(Role::SubLeader),
            "team_leader" => Ok(Role::TeamLeader),
            "admin" => Ok(Role::Admin),
            "trainee" => Ok(Role::Trainee),
            "führungskraft" | "fuehrungskraft" => Ok(Role::Fuehrungskraft),
            _ => Err(crate::error::PulseError::InvalidRole(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// The eight tracked daily activity metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Fa,
    Eh,
    NewAppointments,
    Recommendations,
    TivInvitations,
    TaaInvitations,
    TgsRegistrations,
    BavChecks,
}

impl Metric {
    pub fn all() -> &'static [Metric] {
        &[
            Metric::Fa,
            Metric::Eh,
            Metric::NewAppointments,
            Metric::Recommendations,
            Metric::TivInvitations,
            Metric::TaaInvitations,
            Metric::TgsRegistrations,
            Metric::BavChecks,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Fa => "fa",
            Metric::Eh => "eh",
            Metric::NewAppointments => "new_appointments",
            Metric::Recommendations => "recommendations",
            Metric::TivInvitations => "tiv_invitations",
            Metric::TaaInvitations => "taa_invitations",
            Metric::TgsRegistrations => "tgs_registrations",
            Metric::BavChecks => "bav_checks",
        }
    }

    /// Baseline daily target seeded on first sign-in.
    pub fn default_daily_target(self) -> u32 {
        match self {
            Metric::Fa => 5,
            Metric::Eh => 3,
            Metric::NewAppointments => 3,
            Metric::Recommendations => 2,
            Metric::TivInvitations => 2,
            Metric::TaaInvitations => 1,
            Metric::TgsRegistrations => 1,
            Metric::BavChecks => 2,
        }
    }

    /// Parse a metric key carrying a period suffix, e.g. `fa_daily`.
    pub fn from_suffixed(key: &str, suffix: &str) -> Result<Self, crate::error::PulseError> {
        key.strip_suffix(suffix)
            .and_then(|base| base.parse().ok())
            .ok_or_else(|| crate::error::PulseError::InvalidMetric(key.to_string()))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = crate::error::PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::all()
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| crate::error::PulseError::InvalidMetric(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
