//! SQLite-backed [`RecordStore`].
//!
//! Tables: `users`, `daily_entries` (one INTEGER column per metric so team
//! aggregation stays in SQL), `weekly_goals`, `reflections`,
//! `weekday_questions`. Schema version lives in `PRAGMA user_version`.

use super::{DateRange, RecordStore, UserFilter};
use crate::entry::{DailyEntry, MetricCounts};
use crate::error::{PulseError, Result};
use crate::goal::WeeklyGoal;
use crate::questions::WeekdayQuestions;
use crate::reflection::Reflection;
use crate::targets::TeamAnalytics;
use crate::types::{Metric, Role};
use crate::user::User;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Ordered schema migrations; entry `n` upgrades version `n` to `n + 1`.
const MIGRATIONS: &[&str] = &[r#"
CREATE TABLE users (
    id               TEXT PRIMARY KEY,
    external_id      TEXT NOT NULL UNIQUE,
    display_name     TEXT NOT NULL,
    role             TEXT NOT NULL,
    team_name        TEXT NOT NULL,
    team_id          TEXT,
    parent_leader_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    personal_targets TEXT NOT NULL DEFAULT '{}',
    monthly_targets  TEXT NOT NULL DEFAULT '{}',
    is_team_leader   INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    last_sign_in_at  TEXT
);
CREATE INDEX idx_users_team ON users(team_id);
CREATE INDEX idx_users_leader ON users(parent_leader_id);

CREATE TABLE daily_entries (
    user_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    entry_date        TEXT NOT NULL,
    fa                INTEGER NOT NULL DEFAULT 0,
    eh                INTEGER NOT NULL DEFAULT 0,
    new_appointments  INTEGER NOT NULL DEFAULT 0,
    recommendations   INTEGER NOT NULL DEFAULT 0,
    tiv_invitations   INTEGER NOT NULL DEFAULT 0,
    taa_invitations   INTEGER NOT NULL DEFAULT 0,
    tgs_registrations INTEGER NOT NULL DEFAULT 0,
    bav_checks        INTEGER NOT NULL DEFAULT 0,
    weekday_answers   TEXT NOT NULL DEFAULT '{}',
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    PRIMARY KEY (user_id, entry_date)
);
CREATE INDEX idx_entries_date ON daily_entries(entry_date);

CREATE TABLE weekly_goals (
    user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    week_start_date  TEXT NOT NULL,
    goal_text        TEXT NOT NULL,
    targets          TEXT NOT NULL DEFAULT '{}',
    is_completed     INTEGER NOT NULL DEFAULT 0,
    completion_notes TEXT,
    next_week_focus  TEXT,
    reviewed_at      TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    PRIMARY KEY (user_id, week_start_date)
);

CREATE TABLE reflections (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    reflection_text TEXT NOT NULL,
    mood_score      INTEGER,
    energy_level    INTEGER,
    focus_areas     TEXT NOT NULL DEFAULT '[]',
    action_items    TEXT NOT NULL DEFAULT '[]',
    created_at      TEXT NOT NULL
);
CREATE INDEX idx_reflections_user ON reflections(user_id, created_at);

CREATE TABLE weekday_questions (
    weekday            INTEGER PRIMARY KEY CHECK (weekday BETWEEN 1 AND 7),
    yesterday_question TEXT NOT NULL,
    today_questions    TEXT NOT NULL DEFAULT '[]',
    trainee_question   TEXT NOT NULL
);
"#];

const USER_COLUMNS: &str = "id, external_id, display_name, role, team_name, team_id, \
     parent_leader_id, personal_targets, monthly_targets, is_team_leader, created_at, \
     updated_at, last_sign_in_at";

const GOAL_COLUMNS: &str = "user_id, week_start_date, goal_text, targets, is_completed, \
     completion_notes, next_week_focus, reviewed_at, created_at, updated_at";

const REFLECTION_COLUMNS: &str = "id, user_id, reflection_text, mood_score, energy_level, \
     focus_areas, action_items, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`. Does not migrate; call
    /// [`RecordStore::migrate`] before use.
    pub fn open(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "opening sqlite store");
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// `":memory:"` opens an in-memory database, anything else a file.
    pub fn open_location(location: &str) -> Result<Self> {
        if location == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open(Path::new(location))
        }
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Schema version the binary knows how to produce.
    pub fn latest_version() -> u32 {
        MIGRATIONS.len() as u32
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PulseError::Store(format!("lock poisoned: {e}")))
    }

    fn user_by(&self, column: &str, value: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
        Ok(conn.query_row(&sql, [value], user_from_row).optional()?)
    }
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn conversion(idx: usize, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn col_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion(idx, e))
}

fn col_opt_uuid(row: &Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| conversion(idx, e)))
        .transpose()
}

fn col_ts(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

fn col_opt_ts(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| conversion(idx, e))
    })
    .transpose()
}

fn col_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion(idx, e))
}

fn col_json<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion(idx, e))
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: col_uuid(row, 0)?,
        external_id: row.get(1)?,
        display_name: row.get(2)?,
        role: role.parse::<Role>().map_err(|e| conversion(3, e))?,
        team_name: row.get(4)?,
        team_id: row.get(5)?,
        parent_leader_id: col_opt_uuid(row, 6)?,
        personal_targets: col_json(row, 7)?,
        monthly_targets: col_json(row, 8)?,
        is_team_leader: row.get(9)?,
        created_at: col_ts(row, 10)?,
        updated_at: col_ts(row, 11)?,
        last_sign_in_at: col_opt_ts(row, 12)?,
    })
}

/// SQL sums are i64; clamp into the `u32` counts the core uses.
fn saturating_count(sum: i64) -> u32 {
    u32::try_from(sum.max(0)).unwrap_or(u32::MAX)
}

fn metric_columns() -> String {
    Metric::all()
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn entry_select() -> String {
    format!(
        "SELECT user_id, entry_date, weekday_answers, created_at, updated_at, {} FROM daily_entries",
        metric_columns()
    )
}

const ENTRY_METRIC_OFFSET: usize = 5;

fn entry_from_row(row: &Row) -> rusqlite::Result<DailyEntry> {
    let mut metrics = MetricCounts::new();
    for (i, &metric) in Metric::all().iter().enumerate() {
        metrics.insert(metric, row.get::<_, u32>(ENTRY_METRIC_OFFSET + i)?);
    }
    Ok(DailyEntry {
        user_id: col_uuid(row, 0)?,
        entry_date: col_date(row, 1)?,
        metrics,
        weekday_answers: col_json(row, 2)?,
        created_at: col_ts(row, 3)?,
        updated_at: col_ts(row, 4)?,
    })
}

fn goal_from_row(row: &Row) -> rusqlite::Result<WeeklyGoal> {
    Ok(WeeklyGoal {
        user_id: col_uuid(row, 0)?,
        week_start_date: col_date(row, 1)?,
        goal_text: row.get(2)?,
        targets: col_json(row, 3)?,
        is_completed: row.get(4)?,
        completion_notes: row.get(5)?,
        next_week_focus: row.get(6)?,
        reviewed_at: col_opt_ts(row, 7)?,
        created_at: col_ts(row, 8)?,
        updated_at: col_ts(row, 9)?,
    })
}

fn reflection_from_row(row: &Row) -> rusqlite::Result<Reflection> {
    Ok(Reflection {
        id: col_uuid(row, 0)?,
        user_id: col_uuid(row, 1)?,
        reflection_text: row.get(2)?,
        mood_score: row.get(3)?,
        energy_level: row.get(4)?,
        focus_areas: col_json(row, 5)?,
        action_items: col_json(row, 6)?,
        created_at: col_ts(row, 7)?,
    })
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

impl RecordStore for SqliteStore {
    fn migrate(&self) -> Result<u32> {
        let mut conn = self.lock()?;
        let current: u32 = conn.pragma_query_value(None, "user_version", |r| r.get(0))?;
        let latest = Self::latest_version();
        if current > latest {
            return Err(PulseError::Store(format!(
                "database schema v{current} is newer than supported v{latest}"
            )));
        }
        for (idx, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
            let version = idx as u32 + 1;
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            tracing::info!(version, "applied schema migration");
        }
        Ok(latest)
    }

    fn schema_version(&self) -> Result<u32> {
        let conn = self.lock()?;
        Ok(conn.pragma_query_value(None, "user_version", |r| r.get(0))?)
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.user_by("id", &id.to_string())
    }

    fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        self.user_by("external_id", external_id)
    }

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(team) = &filter.team_id {
            values.push(team.clone());
            clauses.push(format!("team_id = ?{}", values.len()));
        }
        if let Some(role) = filter.role {
            values.push(role.as_str().to_string());
            clauses.push(format!("role = ?{}", values.len()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("SELECT {USER_COLUMNS} FROM users{where_clause} ORDER BY created_at, rowid");
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(values.iter()), user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    fn upsert_user_by_external_id(&self, user: &User) -> Result<User> {
        let conn = self.lock()?;
        let now = ts(&Utc::now());
        conn.execute(
            &format!(
                "INSERT INTO users ({USER_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
                 ON CONFLICT(external_id) DO UPDATE SET updated_at = ?14, last_sign_in_at = ?14"
            ),
            params![
                user.id.to_string(),
                user.external_id,
                user.display_name,
                user.role.as_str(),
                user.team_name,
                user.team_id,
                user.parent_leader_id.map(|id| id.to_string()),
                json(&user.personal_targets)?,
                json(&user.monthly_targets)?,
                user.is_team_leader,
                ts(&user.created_at),
                ts(&user.updated_at),
                user.last_sign_in_at.as_ref().map(ts),
                now,
            ],
        )?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = ?1");
        Ok(conn.query_row(&sql, [&user.external_id], user_from_row)?)
    }

    fn update_user(&self, user: &User) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET external_id = ?2, display_name = ?3, role = ?4, team_name = ?5, \
             team_id = ?6, parent_leader_id = ?7, personal_targets = ?8, monthly_targets = ?9, \
             is_team_leader = ?10, updated_at = ?11, last_sign_in_at = ?12 WHERE id = ?1",
            params![
                user.id.to_string(),
                user.external_id,
                user.display_name,
                user.role.as_str(),
                user.team_name,
                user.team_id,
                user.parent_leader_id.map(|id| id.to_string()),
                json(&user.personal_targets)?,
                json(&user.monthly_targets)?,
                user.is_team_leader,
                ts(&user.updated_at),
                user.last_sign_in_at.as_ref().map(ts),
            ],
        )?;
        Ok(changed > 0)
    }

    fn upsert_entry(&self, entry: &DailyEntry) -> Result<DailyEntry> {
        let conn = self.lock()?;
        let metrics = metric_columns();
        let metric_params: Vec<String> = (0..Metric::all().len()).map(|i| format!("?{}", i + 6)).collect();
        let updates: Vec<String> = Metric::all()
            .iter()
            .map(|m| format!("{0} = excluded.{0}", m.as_str()))
            .collect();
        let sql = format!(
            "INSERT INTO daily_entries (user_id, entry_date, weekday_answers, created_at, updated_at, {metrics}) \
             VALUES (?1, ?2, ?3, ?4, ?5, {}) \
             ON CONFLICT(user_id, entry_date) DO UPDATE SET {}, \
             weekday_answers = excluded.weekday_answers, updated_at = excluded.updated_at",
            metric_params.join(", "),
            updates.join(", ")
        );
        let mut values: Vec<rusqlite::types::Value> = vec![
            entry.user_id.to_string().into(),
            date(entry.entry_date).into(),
            json(&entry.weekday_answers)?.into(),
            ts(&entry.created_at).into(),
            ts(&entry.updated_at).into(),
        ];
        values.extend(Metric::all().iter().map(|&m| i64::from(entry.count(m)).into()));
        conn.execute(&sql, params_from_iter(values))?;

        let select = format!("{} WHERE user_id = ?1 AND entry_date = ?2", entry_select());
        Ok(conn.query_row(
            &select,
            params![entry.user_id.to_string(), date(entry.entry_date)],
            entry_from_row,
        )?)
    }

    fn list_entries(
        &self,
        user_ids: &[Uuid],
        range: DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<DailyEntry>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let placeholders: Vec<String> = (0..user_ids.len()).map(|i| format!("?{}", i + 3)).collect();
        let mut sql = format!(
            "{} WHERE entry_date BETWEEN ?1 AND ?2 AND user_id IN ({}) ORDER BY entry_date DESC, user_id",
            entry_select(),
            placeholders.join(", ")
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        let mut values = vec![date(range.from), date(range.to)];
        values.extend(user_ids.iter().map(Uuid::to_string));
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(values.iter()), entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn get_goal(&self, user_id: Uuid, week_start: NaiveDate) -> Result<Option<WeeklyGoal>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {GOAL_COLUMNS} FROM weekly_goals WHERE user_id = ?1 AND week_start_date = ?2");
        Ok(conn
            .query_row(&sql, params![user_id.to_string(), date(week_start)], goal_from_row)
            .optional()?)
    }

    fn upsert_goal(&self, goal: &WeeklyGoal) -> Result<WeeklyGoal> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO weekly_goals ({GOAL_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                 ON CONFLICT(user_id, week_start_date) DO UPDATE SET \
                 goal_text = excluded.goal_text, targets = excluded.targets, \
                 updated_at = excluded.updated_at"
            ),
            params![
                goal.user_id.to_string(),
                date(goal.week_start_date),
                goal.goal_text,
                json(&goal.targets)?,
                goal.is_completed,
                goal.completion_notes,
                goal.next_week_focus,
                goal.reviewed_at.as_ref().map(ts),
                ts(&goal.created_at),
                ts(&goal.updated_at),
            ],
        )?;
        let sql = format!("SELECT {GOAL_COLUMNS} FROM weekly_goals WHERE user_id = ?1 AND week_start_date = ?2");
        Ok(conn.query_row(
            &sql,
            params![goal.user_id.to_string(), date(goal.week_start_date)],
            goal_from_row,
        )?)
    }

    fn update_goal(&self, goal: &WeeklyGoal) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE weekly_goals SET goal_text = ?3, targets = ?4, is_completed = ?5, \
             completion_notes = ?6, next_week_focus = ?7, reviewed_at = ?8, updated_at = ?9 \
             WHERE user_id = ?1 AND week_start_date = ?2",
            params![
                goal.user_id.to_string(),
                date(goal.week_start_date),
                goal.goal_text,
                json(&goal.targets)?,
                goal.is_completed,
                goal.completion_notes,
                goal.next_week_focus,
                goal.reviewed_at.as_ref().map(ts),
                ts(&goal.updated_at),
            ],
        )?;
        Ok(changed > 0)
    }

    fn list_goals(&self, user_id: Uuid, limit: usize) -> Result<Vec<WeeklyGoal>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {GOAL_COLUMNS} FROM weekly_goals WHERE user_id = ?1 \
             ORDER BY week_start_date DESC LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let goals = stmt
            .query_map(params![user_id.to_string(), limit as i64], goal_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(goals)
    }

    fn insert_reflection(&self, reflection: &Reflection) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT INTO reflections ({REFLECTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                reflection.id.to_string(),
                reflection.user_id.to_string(),
                reflection.reflection_text,
                reflection.mood_score,
                reflection.energy_level,
                json(&reflection.focus_areas)?,
                json(&reflection.action_items)?,
                ts(&reflection.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_reflections(&self, user_id: Uuid, limit: usize) -> Result<Vec<Reflection>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {REFLECTION_COLUMNS} FROM reflections WHERE user_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let reflections = stmt
            .query_map(params![user_id.to_string(), limit as i64], reflection_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reflections)
    }

    fn get_weekday_questions(&self, weekday: u8) -> Result<Option<WeekdayQuestions>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT weekday, yesterday_question, today_questions, trainee_question \
                 FROM weekday_questions WHERE weekday = ?1",
                [weekday],
                |row| {
                    Ok(WeekdayQuestions {
                        weekday: row.get(0)?,
                        yesterday_question: row.get(1)?,
                        today_questions: col_json(row, 2)?,
                        trainee_question: row.get(3)?,
                        is_fallback: false,
                    })
                },
            )
            .optional()?)
    }

    fn put_weekday_questions(&self, questions: &WeekdayQuestions) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO weekday_questions (weekday, yesterday_question, today_questions, trainee_question) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(weekday) DO UPDATE SET yesterday_question = excluded.yesterday_question, \
             today_questions = excluded.today_questions, trainee_question = excluded.trainee_question",
            params![
                questions.weekday,
                questions.yesterday_question,
                json(&questions.today_questions)?,
                questions.trainee_question,
            ],
        )?;
        Ok(())
    }

    fn team_analytics(&self, team_id: &str, range: DateRange) -> Result<Option<TeamAnalytics>> {
        let conn = self.lock()?;
        let sums: Vec<String> = Metric::all()
            .iter()
            .map(|m| format!("COALESCE(SUM(e.{}), 0)", m.as_str()))
            .collect();
        let sql = format!(
            "SELECT COUNT(*), COUNT(DISTINCT e.user_id), {} \
             FROM daily_entries e JOIN users u ON u.id = e.user_id \
             WHERE u.team_id = ?1 AND e.entry_date BETWEEN ?2 AND ?3",
            sums.join(", ")
        );
        let (entry_count, member_count, totals) = conn.query_row(
            &sql,
            params![team_id, date(range.from), date(range.to)],
            |row| {
                let mut totals = MetricCounts::new();
                for (i, &metric) in Metric::all().iter().enumerate() {
                    totals.insert(metric, saturating_count(row.get::<_, i64>(2 + i)?));
                }
                Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?, totals))
            },
        )?;
        tracing::debug!(team_id, entry_count, "team analytics aggregated");
        Ok(TeamAnalytics::from_totals(
            team_id,
            range,
            member_count,
            entry_count,
            totals,
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
