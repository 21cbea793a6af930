pub mod admin;
pub mod entries;
pub mod goals;
pub mod health;
pub mod questions;
pub mod reflections;
pub mod session;
pub mod team;
pub mod users;

use crate::error::AppError;
use axum::Json;
use chrono::NaiveDate;
use pulse_core::store::DateRange;
use serde::{Deserialize, Serialize};

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 200;

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, AppError>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope { success: true, data }))
}

/// Run a synchronous core call on the blocking pool.
pub async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> pulse_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let value = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Shared query strings
// ---------------------------------------------------------------------------

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD&limit=N`. Defaults to month-to-date.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl RangeQuery {
    pub fn range(&self, today: NaiveDate) -> pulse_core::Result<DateRange> {
        let default = DateRange::month_to_date(today);
        DateRange::new(self.from.unwrap_or(default.from), self.to.unwrap_or(default.to))
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit.map(|l| l.min(MAX_HISTORY_LIMIT))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn range_defaults_to_month_to_date() {
        let r = RangeQuery::default().range(d(3, 18)).unwrap();
        assert_eq!((r.from, r.to), (d(3, 1), d(3, 18)));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let q = RangeQuery {
            from: Some(d(3, 10)),
            to: Some(d(3, 2)),
            limit: None,
        };
        assert!(q.range(d(3, 18)).is_err());
    }

    #[test]
    fn limits_are_capped() {
        let q = LimitQuery { limit: Some(10_000) };
        assert_eq!(q.limit(), MAX_HISTORY_LIMIT);
        assert_eq!(LimitQuery::default().limit(), DEFAULT_HISTORY_LIMIT);
    }
}
