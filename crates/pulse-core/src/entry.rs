use crate::error::{PulseError, Result};
use crate::store::RecordStore;
use crate::types::Metric;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Actual per-metric counts for one day. Absent metrics count as zero.
pub type MetricCounts = BTreeMap<Metric, u32>;

/// Upper bound on any single metric count in one daily entry.
pub const MAX_DAILY_COUNT: u32 = 10_000;

// ---------------------------------------------------------------------------
// DailyEntry
// ---------------------------------------------------------------------------

/// One user's recorded activity for one calendar date. Unique per
/// `(user_id, entry_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    #[serde(default)]
    pub metrics: MetricCounts,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub weekday_answers: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyEntry {
    pub fn count(&self, metric: Metric) -> u32 {
        self.metrics.get(&metric).copied().unwrap_or(0)
    }
}

/// Payload for recording (or re-recording) a day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryInput {
    /// Defaults to the server's current date.
    #[serde(default)]
    pub entry_date: Option<NaiveDate>,
    #[serde(default)]
    pub metrics: MetricCounts,
    #[serde(default)]
    pub weekday_answers: BTreeMap<String, String>,
}

impl EntryInput {
    pub fn into_entry(self, user_id: Uuid, today: NaiveDate) -> Result<DailyEntry> {
        let entry_date = self.entry_date.unwrap_or(today);
        if entry_date > today {
            return Err(PulseError::validation(format!(
                "entry_date {entry_date} is in the future"
            )));
        }
        if let Some((metric, count)) = self.metrics.iter().find(|(_, c)| **c > MAX_DAILY_COUNT) {
            return Err(PulseError::validation(format!(
                "{metric} count {count} exceeds the daily maximum of {MAX_DAILY_COUNT}"
            )));
        }
        if let Some(key) = self.weekday_answers.keys().find(|k| k.trim().is_empty()) {
            return Err(PulseError::validation(format!(
                "weekday answer key '{key}' is blank"
            )));
        }
        let now = Utc::now();
        Ok(DailyEntry {
            user_id,
            entry_date,
            metrics: self.metrics,
            weekday_answers: self.weekday_answers,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Sum counts per metric across `entries`; every metric is present. Sums
/// saturate at `u32::MAX`.
pub fn totals<'a>(entries: impl IntoIterator<Item = &'a DailyEntry>) -> MetricCounts {
    let mut out: MetricCounts = Metric::all().iter().map(|&m| (m, 0)).collect();
    for entry in entries {
        for (&metric, &count) in &entry.metrics {
            let total = out.entry(metric).or_insert(0);
            *total = total.saturating_add(count);
        }
    }
    out
}

/// Upsert the caller's own entry for `input.entry_date` (default today).
pub fn record_entry(
    store: &dyn RecordStore,
    user_id: Uuid,
    input: EntryInput,
    today: NaiveDate,
) -> Result<DailyEntry> {
    let entry = input.into_entry(user_id, today)?;
    let stored = store.upsert_entry(&entry)?;
    tracing::info!(%user_id, date = %stored.entry_date, "daily entry recorded");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn input_defaults_to_today() {
        let entry = EntryInput::default().into_entry(Uuid::new_v4(), day(10)).unwrap();
        assert_eq!(entry.entry_date, day(10));
    }

    #[test]
    fn input_rejects_future_date() {
        let input = EntryInput {
            entry_date: Some(day(11)),
            ..Default::default()
        };
        assert!(matches!(
            input.into_entry(Uuid::new_v4(), day(10)),
            Err(PulseError::Validation(_))
        ));
    }

    #[test]
    fn metrics_deserialize_by_plain_name() {
        let input: EntryInput =
            serde_json::from_value(serde_json::json!({"metrics": {"fa": 4, "bav_checks": 1}}))
                .unwrap();
        assert_eq!(input.metrics.get(&Metric::Fa), Some(&4));
        assert_eq!(input.metrics.get(&Metric::BavChecks), Some(&1));
    }

    #[test]
    fn record_twice_same_day_upserts() {
        use crate::store::{DateRange, MemoryStore};
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let input = |fa| EntryInput {
            entry_date: None,
            metrics: [(Metric::Fa, fa)].into_iter().collect(),
            ..Default::default()
        };
        let first = record_entry(&store, user, input(1), day(10)).unwrap();
        let second = record_entry(&store, user, input(4), day(10)).unwrap();
        assert_eq!(second.created_at, first.created_at);
        let range = DateRange::new(day(1), day(10)).unwrap();
        let listed = store.list_entries(&[user], range, None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].count(Metric::Fa), 4);
    }

    #[test]
    fn totals_fill_every_metric() {
        let user = Uuid::new_v4();
        let mk = |fa| {
            EntryInput {
                entry_date: Some(day(1)),
                metrics: [(Metric::Fa, fa)].into_iter().collect(),
                ..Default::default()
            }
            .into_entry(user, day(1))
            .unwrap()
        };
        let entries = [mk(2), mk(3)];
        let sum = totals(&entries);
        assert_eq!(sum[&Metric::Fa], 5);
        assert_eq!(sum[&Metric::Eh], 0);
        assert_eq!(sum.len(), Metric::all().len());
    }

    #[test]
    fn input_rejects_counts_above_daily_maximum() {
        let input = EntryInput {
            metrics: [(Metric::Fa, MAX_DAILY_COUNT + 1)].into_iter().collect(),
            ..Default::default()
        };
        let err = input.into_entry(Uuid::new_v4(), day(10)).unwrap_err();
        assert!(matches!(err, PulseError::Validation(ref m) if m.contains("fa")));

        let input = EntryInput {
            metrics: [(Metric::Fa, MAX_DAILY_COUNT)].into_iter().collect(),
            ..Default::default()
        };
        assert!(input.into_entry(Uuid::new_v4(), day(10)).is_ok());
    }

    #[test]
    fn totals_saturate_on_large_counts() {
        let user = Uuid::new_v4();
        let big = |d| DailyEntry {
            user_id: user,
            entry_date: day(d),
            metrics: [(Metric::Fa, 3_000_000_000), (Metric::Eh, 1)].into_iter().collect(),
            weekday_answers: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let sum = totals(&[big(1), big(2)]);
        assert_eq!(sum[&Metric::Fa], u32::MAX);
        assert_eq!(sum[&Metric::Eh], 2);
    }
}
