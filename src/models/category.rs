use serde::{Deserialize, Serialize};
use std::fmt;

/// A named group of habits. A habit may belong to several categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
    pub habit_ids: Vec<i64>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            habit_ids: Vec::new(),
        }
    }

    pub fn with_habits(mut self, habit_ids: Vec<i64>) -> Self {
        self.habit_ids = habit_ids;
        self
    }

    pub fn contains(&self, habit_id: i64) -> bool {
        self.habit_ids.contains(&habit_id)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "[{}] {}", id, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
