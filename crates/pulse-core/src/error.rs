use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulseError {
    #[error("unauthorized: no verified identity")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("no weekly goal for user {user_id} in week starting {week_start}")]
    GoalNotFound { user_id: String, week_start: NaiveDate },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("unknown metric: {0}")]
    InvalidMetric(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for PulseError {
    fn from(err: rusqlite::Error) -> Self {
        PulseError::Store(err.to_string())
    }
}

impl PulseError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PulseError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        PulseError::Forbidden(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;
