use crate::error::{PulseError, Result};
use crate::store::RecordStore;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Prompts shown for a calendar weekday (1=Monday..7=Sunday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayQuestions {
    pub weekday: u8,
    pub yesterday_question: String,
    pub today_questions: Vec<String>,
    pub trainee_question: String,
    /// True when served from the built-in set rather than the store.
    #[serde(default, skip_deserializing)]
    pub is_fallback: bool,
}

impl WeekdayQuestions {
    /// Built-in prompts used when a weekday has no stored row or the weekday
    /// number is out of range.
    pub fn fallback(weekday: u8) -> Self {
        Self {
            weekday,
            yesterday_question: "What did you accomplish yesterday?".to_string(),
            today_questions: vec![
                "What is your most important goal today?".to_string(),
                "Which appointments are planned for today?".to_string(),
                "Who will you ask for a recommendation today?".to_string(),
            ],
            trainee_question: "What did you learn yesterday and how will you apply it today?"
                .to_string(),
            is_fallback: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_weekday(self.weekday) {
            return Err(PulseError::validation(format!(
                "weekday must be between 1 and 7, got {}",
                self.weekday
            )));
        }
        if self.yesterday_question.trim().is_empty() || self.trainee_question.trim().is_empty() {
            return Err(PulseError::validation("questions must not be blank"));
        }
        if self.today_questions.iter().any(|q| q.trim().is_empty()) {
            return Err(PulseError::validation("today_questions must not contain blanks"));
        }
        Ok(())
    }
}

pub fn is_valid_weekday(weekday: u8) -> bool {
    (1..=7).contains(&weekday)
}

/// Weekday number from a path segment. Anything that is not a number in
/// `u8` range maps to 0, which [`questions_for`] serves as the fallback.
pub fn parse_weekday(raw: &str) -> u8 {
    raw.trim().parse::<u8>().unwrap_or(0)
}

/// Weekday number for `date`, Monday=1..Sunday=7.
pub fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Questions for `weekday`, falling back to the built-in set for an invalid
/// weekday or a missing row. Store failures still propagate.
pub fn questions_for(store: &dyn RecordStore, weekday: u8) -> Result<WeekdayQuestions> {
    if !is_valid_weekday(weekday) {
        return Ok(WeekdayQuestions::fallback(weekday));
    }
    Ok(store
        .get_weekday_questions(weekday)?
        .unwrap_or_else(|| WeekdayQuestions::fallback(weekday)))
}

pub fn replace_questions(store: &dyn RecordStore, questions: WeekdayQuestions) -> Result<WeekdayQuestions> {
    questions.validate()?;
    let questions = WeekdayQuestions {
        is_fallback: false,
        ..questions
    };
    store.put_weekday_questions(&questions)?;
    tracing::info!(weekday = questions.weekday, "weekday questions replaced");
    Ok(questions)
}
