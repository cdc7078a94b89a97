//! Wire types of the remote service and the mappings to and from the models.
//!
//! The remote schema is narrower than the models. Narrowing drops every field
//! the wire does not carry; widening fills them with the constants below, so a
//! round trip through the remote store is lossy by construction:
//!
//! | Habit field            | Value after widening |
//! |------------------------|----------------------|
//! | `position`             | 0                    |
//! | `kind`                 | `Boolean`            |
//! | `target_value`         | 1.0                  |
//! | `partial_value`        | 1.0                  |
//! | `unit`, `cue`, `reward`, `description` | empty |
//! | `reminder`             | `None`               |
//! | `reminder_days`        | 0                    |
//! | `two_day_rule`         | false                |
//! | `category_ids`, `events` | empty              |
//!
//! `archived` travels as its negation, `is_device`.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    weekday_from_index, weekday_index, Category, Event, EventPayload, Habit, HabitKind, Log, Rule,
};
use crate::repository::{RepositoryError, Result};

pub const DEFAULT_POSITION: i64 = 0;
pub const DEFAULT_KIND: HabitKind = HabitKind::Boolean;
pub const DEFAULT_TARGET_VALUE: f64 = 1.0;
pub const DEFAULT_PARTIAL_VALUE: f64 = 1.0;
pub const DEFAULT_REMINDER_DAYS: u8 = 0;
pub const DEFAULT_TWO_DAY_RULE: bool = false;

/// Accepts an identifier sent as a number or as a numeric string.
///
/// Anything else (non-numeric strings, floats, null) decodes to `None`.
fn flexible_id<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteHabit {
    #[serde(
        default,
        deserialize_with = "flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub habit_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub is_device: bool,
}

#[derive(Debug, Deserialize)]
pub struct HabitsEnvelope {
    pub habits: Vec<RemoteHabit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub habit_id: i64,
    pub date: NaiveDate,
    pub progress: f64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventsEnvelope {
    pub events: Vec<RemoteEvent>,
}

/// Body of the event map endpoint and of batch inserts.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventMapEnvelope {
    pub events: BTreeMap<NaiveDate, EventPayload>,
}

#[derive(Debug, Serialize)]
pub struct EventKey {
    pub habit_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCategory {
    #[serde(
        default,
        deserialize_with = "flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub habits: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CategoriesEnvelope {
    pub categories: Vec<RemoteCategory>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedId {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRule {
    #[serde(
        default,
        deserialize_with = "flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    pub habit: String,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteLog {
    #[serde(
        default,
        deserialize_with = "flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub reported: bool,
}

/// The `{ "result": [...] }` envelope used by rules and logs.
#[derive(Debug, Deserialize)]
pub struct ResultEnvelope<T> {
    pub result: Vec<T>,
}

pub fn narrow_habit(habit: &Habit) -> RemoteHabit {
    RemoteHabit {
        habit_id: habit.id,
        name: habit.title.clone(),
        is_device: !habit.archived,
    }
}

pub fn widen_habit(remote: RemoteHabit) -> Habit {
    Habit {
        id: remote.habit_id,
        title: remote.name,
        position: DEFAULT_POSITION,
        kind: DEFAULT_KIND,
        target_value: DEFAULT_TARGET_VALUE,
        partial_value: DEFAULT_PARTIAL_VALUE,
        unit: String::new(),
        archived: !remote.is_device,
        reminder: None,
        reminder_days: DEFAULT_REMINDER_DAYS,
        cue: String::new(),
        reward: String::new(),
        description: String::new(),
        two_day_rule: DEFAULT_TWO_DAY_RULE,
        category_ids: Vec::new(),
        events: Vec::new(),
    }
}

pub fn narrow_event(event: &Event) -> RemoteEvent {
    RemoteEvent {
        habit_id: event.habit_id,
        date: event.date,
        progress: event.progress,
        note: event.note.clone(),
    }
}

pub fn widen_event(remote: RemoteEvent) -> Event {
    Event {
        habit_id: remote.habit_id,
        date: remote.date,
        progress: remote.progress,
        note: remote.note,
    }
}

pub fn narrow_category(category: &Category) -> RemoteCategory {
    RemoteCategory {
        id: category.id,
        name: category.name.clone(),
        habits: category.habit_ids.clone(),
    }
}

pub fn widen_category(remote: RemoteCategory) -> Category {
    Category {
        id: remote.id,
        name: remote.name,
        habit_ids: remote.habits,
    }
}

pub fn narrow_rule(rule: &Rule) -> RemoteRule {
    RemoteRule {
        id: rule.id,
        habit: rule.habit.clone(),
        day: weekday_index(rule.day),
        hour: rule.hour,
        minute: rule.minute,
        active: rule.active,
    }
}

pub fn widen_rule(remote: RemoteRule) -> Result<Rule> {
    let day = weekday_from_index(remote.day).ok_or_else(|| {
        RepositoryError::SchemaMismatch(format!("weekday out of range: {}", remote.day))
    })?;
    Ok(Rule {
        id: remote.id,
        habit: remote.habit,
        day,
        hour: remote.hour,
        minute: remote.minute,
        active: remote.active,
    })
}

pub fn narrow_log(log: &Log) -> RemoteLog {
    RemoteLog {
        id: log.id,
        name: log.habit.clone(),
        state: log.state.clone(),
        reported: log.self_reported,
    }
}

pub fn widen_log(remote: RemoteLog) -> Log {
    Log {
        id: remote.id,
        habit: remote.name,
        state: remote.state,
        self_reported: remote.reported,
    }
}
