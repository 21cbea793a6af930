use crate::error::{PulseError, Result};
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SCORE_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// An append-only journal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reflection_text: String,
    #[serde(default)]
    pub mood_score: Option<u8>,
    #[serde(default)]
    pub energy_level: Option<u8>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReflectionInput {
    pub reflection_text: String,
    #[serde(default)]
    pub mood_score: Option<u8>,
    #[serde(default)]
    pub energy_level: Option<u8>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl ReflectionInput {
    fn validate(&self) -> Result<()> {
        if self.reflection_text.trim().is_empty() {
            return Err(PulseError::validation("reflection_text is required"));
        }
        for (field, value) in [("mood_score", self.mood_score), ("energy_level", self.energy_level)] {
            if let Some(v) = value {
                if !SCORE_RANGE.contains(&v) {
                    return Err(PulseError::validation(format!(
                        "{field} must be between 1 and 10, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

pub fn add_reflection(
    store: &dyn RecordStore,
    user_id: Uuid,
    input: ReflectionInput,
) -> Result<Reflection> {
    input.validate()?;
    let reflection = Reflection {
        id: Uuid::new_v4(),
        user_id,
        reflection_text: input.reflection_text,
        mood_score: input.mood_score,
        energy_level: input.energy_level,
        focus_areas: input.focus_areas,
        action_items: input.action_items,
        created_at: Utc::now(),
    };
    store.insert_reflection(&reflection)?;
    tracing::info!(%user_id, id = %reflection.id, "reflection recorded");
    Ok(reflection)
}
