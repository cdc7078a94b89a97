use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Progress recorded for one habit on one day.
///
/// Identified by `(habit_id, date)`; a habit has at most one event per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub habit_id: i64,
    pub date: NaiveDate,
    pub progress: f64,
    pub note: Option<String>,
}

/// The date-independent part of an event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventPayload {
    pub progress: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl Event {
    pub fn new(habit_id: i64, date: NaiveDate, progress: f64) -> Self {
        Self {
            habit_id,
            date,
            progress,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn from_payload(habit_id: i64, date: NaiveDate, payload: EventPayload) -> Self {
        Self {
            habit_id,
            date,
            progress: payload.progress,
            note: payload.note,
        }
    }

    pub fn payload(&self) -> EventPayload {
        EventPayload {
            progress: self.progress,
            note: self.note.clone(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.date, self.progress)?;
        if let Some(note) = &self.note {
            write!(f, "  {}", note)?;
        }
        Ok(())
    }
}

/// Collapses entries into one payload per date, later entries winning.
pub fn dedupe_by_date(entries: &[(NaiveDate, EventPayload)]) -> BTreeMap<NaiveDate, EventPayload> {
    entries
        .iter()
        .map(|(date, payload)| (*date, payload.clone()))
        .collect()
}
