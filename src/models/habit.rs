use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::event::Event;

/// How progress on a habit is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitKind {
    /// Done / not done for a given day.
    #[default]
    Boolean,
    /// A numeric amount measured against `target_value`.
    Numeric,
}

impl fmt::Display for HabitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HabitKind::Boolean => write!(f, "boolean"),
            HabitKind::Numeric => write!(f, "numeric"),
        }
    }
}

impl FromStr for HabitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boolean" => Ok(HabitKind::Boolean),
            "numeric" => Ok(HabitKind::Numeric),
            _ => Err(format!(
                "Invalid habit kind '{}'. Valid options: boolean, numeric",
                s
            )),
        }
    }
}

/// A tracked habit.
///
/// `id` is `None` until a store has assigned one. Once assigned it never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: Option<i64>,
    pub title: String,
    pub position: i64,
    pub kind: HabitKind,
    pub target_value: f64,
    pub partial_value: f64,
    pub unit: String,
    pub archived: bool,
    pub reminder: Option<NaiveTime>,
    /// Weekday bitmask for reminders, Monday is bit 0.
    pub reminder_days: u8,
    pub cue: String,
    pub reward: String,
    pub description: String,
    pub two_day_rule: bool,
    pub category_ids: Vec<i64>,
    pub events: Vec<Event>,
}

impl Habit {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            position: 0,
            kind: HabitKind::Boolean,
            target_value: 1.0,
            partial_value: 1.0,
            unit: String::new(),
            archived: false,
            reminder: None,
            reminder_days: 0,
            cue: String::new(),
            reward: String::new(),
            description: String::new(),
            two_day_rule: false,
            category_ids: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_kind(mut self, kind: HabitKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_target(mut self, target_value: f64, unit: impl Into<String>) -> Self {
        self.target_value = target_value;
        self.unit = unit.into();
        self
    }

    pub fn with_position(mut self, position: i64) -> Self {
        self.position = position;
        self
    }

    pub fn with_reminder(mut self, time: NaiveTime, days: u8) -> Self {
        self.reminder = Some(time);
        self.reminder_days = days;
        self
    }

    pub fn archived(mut self) -> Self {
        self.archived = true;
        self
    }
}

impl fmt::Display for Habit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(f, "[{}] {}", id, self.title)?;
        if self.kind == HabitKind::Numeric {
            write!(f, " (target {} {})", self.target_value, self.unit)?;
        }
        if self.archived {
            write!(f, " (archived)")?;
        }
        Ok(())
    }
}
