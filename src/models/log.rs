use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A state report for a habit, either entered by the user or sent by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub id: Option<i64>,
    pub habit: String,
    pub state: String,
    pub self_reported: bool,
}

/// The individually updatable fields of a [`Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogField {
    Habit,
    State,
    SelfReported,
}

impl Log {
    pub fn new(habit: impl Into<String>, state: impl Into<String>, self_reported: bool) -> Self {
        Self {
            id: None,
            habit: habit.into(),
            state: state.into(),
            self_reported,
        }
    }

    /// Sets one field from its textual value.
    pub fn apply(&mut self, field: LogField, value: &str) -> Result<(), String> {
        match field {
            LogField::Habit => self.habit = value.to_string(),
            LogField::State => self.state = value.to_string(),
            LogField::SelfReported => {
                self.self_reported = value
                    .parse()
                    .map_err(|_| format!("Invalid boolean '{}'", value))?
            }
        }
        Ok(())
    }

    /// Fields whose values differ from `other`, with this record's value.
    pub fn changed_fields(&self, other: &Log) -> Vec<(LogField, String)> {
        let mut changes = Vec::new();
        if self.habit != other.habit {
            changes.push((LogField::Habit, self.habit.clone()));
        }
        if self.state != other.state {
            changes.push((LogField::State, self.state.clone()));
        }
        if self.self_reported != other.self_reported {
            changes.push((LogField::SelfReported, self.self_reported.to_string()));
        }
        changes
    }
}

impl fmt::Display for LogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogField::Habit => write!(f, "name"),
            LogField::State => write!(f, "state"),
            LogField::SelfReported => write!(f, "reported"),
        }
    }
}

impl FromStr for LogField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" | "habit" => Ok(LogField::Habit),
            "state" => Ok(LogField::State),
            "reported" => Ok(LogField::SelfReported),
            _ => Err(format!(
                "Invalid log field '{}'. Valid options: name, state, reported",
                s
            )),
        }
    }
}
