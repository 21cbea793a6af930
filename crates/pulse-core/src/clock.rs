use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for every calendar-derived computation.
///
/// Week boundaries and month-end checks always use the server's clock, never
/// a caller-supplied date. `Fixed` exists so tests can pin the calendar.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn fixed_date(date: NaiveDate) -> Self {
        Clock::Fixed(date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc())
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(ts) => *ts,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
