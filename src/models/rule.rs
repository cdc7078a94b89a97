use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A weekly reminder slot for a habit.
///
/// Rules refer to their habit by title, which is how the remote service keys them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Option<i64>,
    pub habit: String,
    pub day: Weekday,
    pub hour: u8,
    pub minute: u8,
    pub active: bool,
}

impl Rule {
    pub fn new(habit: impl Into<String>, day: Weekday, hour: u8, minute: u8) -> Self {
        Self {
            id: None,
            habit: habit.into(),
            day,
            hour,
            minute,
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// True when both rules fire at the same slot for the same habit.
    pub fn same_slot(&self, other: &Rule) -> bool {
        self.habit == other.habit
            && self.day == other.day
            && self.hour == other.hour
            && self.minute == other.minute
    }
}

/// Monday is 0.
pub fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_monday() as u8
}

pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:02}:{:02}",
            self.habit, self.day, self.hour, self.minute
        )?;
        if !self.active {
            write!(f, " (off)")?;
        }
        Ok(())
    }
}
