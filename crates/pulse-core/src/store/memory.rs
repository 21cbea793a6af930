use super::{DateRange, RecordStore, UserFilter};
use crate::entry::{self, DailyEntry};
use crate::error::{PulseError, Result};
use crate::goal::WeeklyGoal;
use crate::questions::WeekdayQuestions;
use crate::reflection::Reflection;
use crate::targets::TeamAnalytics;
use crate::user::User;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SCHEMA_VERSION: u32 = 1;

#[derive(Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    entries: BTreeMap<(Uuid, NaiveDate), DailyEntry>,
    goals: BTreeMap<(Uuid, NaiveDate), WeeklyGoal>,
    reflections: Vec<Reflection>,
    questions: BTreeMap<u8, WeekdayQuestions>,
}

/// In-process store with the same semantics as [`super::SqliteStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PulseError::Store("memory store lock poisoned".into()))
    }
}

impl RecordStore for MemoryStore {
    fn migrate(&self) -> Result<u32> {
        Ok(SCHEMA_VERSION)
    }

    fn schema_version(&self) -> Result<u32> {
        Ok(SCHEMA_VERSION)
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .lock()?
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    fn upsert_user_by_external_id(&self, user: &User) -> Result<User> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables
            .users
            .values_mut()
            .find(|u| u.external_id == user.external_id)
        {
            let now = Utc::now();
            existing.updated_at = now;
            existing.last_sign_in_at = Some(now);
            return Ok(existing.clone());
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    fn update_user(&self, user: &User) -> Result<bool> {
        let mut tables = self.lock()?;
        match tables.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn upsert_entry(&self, entry: &DailyEntry) -> Result<DailyEntry> {
        let mut tables = self.lock()?;
        let key = (entry.user_id, entry.entry_date);
        let stored = match tables.entries.get(&key) {
            Some(existing) => DailyEntry {
                created_at: existing.created_at,
                ..entry.clone()
            },
            None => entry.clone(),
        };
        tables.entries.insert(key, stored.clone());
        Ok(stored)
    }

    fn list_entries(
        &self,
        user_ids: &[Uuid],
        range: DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<DailyEntry>> {
        let ids: HashSet<&Uuid> = user_ids.iter().collect();
        let mut out: Vec<DailyEntry> = self
            .lock()?
            .entries
            .values()
            .filter(|e| ids.contains(&e.user_id) && range.contains(e.entry_date))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn get_goal(&self, user_id: Uuid, week_start: NaiveDate) -> Result<Option<WeeklyGoal>> {
        Ok(self.lock()?.goals.get(&(user_id, week_start)).cloned())
    }

    fn upsert_goal(&self, goal: &WeeklyGoal) -> Result<WeeklyGoal> {
        let mut tables = self.lock()?;
        let key = (goal.user_id, goal.week_start_date);
        let stored = match tables.goals.get(&key) {
            Some(existing) => WeeklyGoal {
                goal_text: goal.goal_text.clone(),
                targets: goal.targets.clone(),
                updated_at: goal.updated_at,
                ..existing.clone()
            },
            None => goal.clone(),
        };
        tables.goals.insert(key, stored.clone());
        Ok(stored)
    }

    fn update_goal(&self, goal: &WeeklyGoal) -> Result<bool> {
        let mut tables = self.lock()?;
        match tables.goals.get_mut(&(goal.user_id, goal.week_start_date)) {
            Some(slot) => {
                *slot = goal.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_goals(&self, user_id: Uuid, limit: usize) -> Result<Vec<WeeklyGoal>> {
        Ok(self
            .lock()?
            .goals
            .range((user_id, NaiveDate::MIN)..=(user_id, NaiveDate::MAX))
            .rev()
            .take(limit)
            .map(|(_, g)| g.clone())
            .collect())
    }

    fn insert_reflection(&self, reflection: &Reflection) -> Result<()> {
        self.lock()?.reflections.push(reflection.clone());
        Ok(())
    }

    fn list_reflections(&self, user_id: Uuid, limit: usize) -> Result<Vec<Reflection>> {
        Ok(self
            .lock()?
            .reflections
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get_weekday_questions(&self, weekday: u8) -> Result<Option<WeekdayQuestions>> {
        Ok(self.lock()?.questions.get(&weekday).cloned())
    }

    fn put_weekday_questions(&self, questions: &WeekdayQuestions) -> Result<()> {
        self.lock()?
            .questions
            .insert(questions.weekday, questions.clone());
        Ok(())
    }

    fn team_analytics(&self, team_id: &str, range: DateRange) -> Result<Option<TeamAnalytics>> {
        let tables = self.lock()?;
        let members: HashSet<Uuid> = tables
            .users
            .values()
            .filter(|u| u.team_id.as_deref() == Some(team_id))
            .map(|u| u.id)
            .collect();
        let matching: Vec<&DailyEntry> = tables
            .entries
            .values()
            .filter(|e| members.contains(&e.user_id) && range.contains(e.entry_date))
            .collect();
        let active: HashSet<Uuid> = matching.iter().map(|e| e.user_id).collect();
        let totals = entry::totals(matching.iter().copied());
        Ok(TeamAnalytics::from_totals(
            team_id,
            range,
            active.len() as u32,
            matching.len() as u32,
            totals,
        ))
    }
}
