//! Repository contracts.
//!
//! One trait per entity family. Each trait is implemented by a local adapter
//! (`crate::db`) and a remote adapter (`crate::remote`); callers only ever see
//! `Arc<dyn …Repository>` handed out by [`crate::selector::Repositories`].
//!
//! Shared semantics:
//! - `find*` returns `Ok(None)` when nothing matches.
//! - `update` fails with [`RepositoryError::NotFound`] for an unknown identifier.
//! - `delete` of an unknown identifier succeeds without doing anything.

mod error;

pub use error::{RepositoryError, Result};

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{Category, Event, EventPayload, Habit, Log, LogField, Rule};

/// Identifier returned by `create` when the record was stored but its
/// identifier could not be determined. Never authoritative.
pub const UNRESOLVED_ID: i64 = 0;

/// Turns the unresolved sentinel into an error for callers that need a real id.
pub fn require_resolved(id: i64, title: &str) -> Result<i64> {
    if id == UNRESOLVED_ID {
        Err(RepositoryError::IdentityUnresolved {
            title: title.to_string(),
        })
    } else {
        Ok(id)
    }
}

/// Extracts the identifier of a record about to be updated.
pub(crate) fn existing_id(id: Option<i64>, entity: &'static str) -> Result<i64> {
    id.ok_or_else(|| RepositoryError::not_found(entity, "<unassigned>"))
}

#[async_trait]
pub trait HabitRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Habit>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Habit>>;

    async fn find_by_title(&self, title: &str) -> Result<Option<Habit>>;

    /// Stores a new habit and returns its identifier, or [`UNRESOLVED_ID`].
    async fn create(&self, habit: &Habit) -> Result<i64>;

    async fn update(&self, habit: &Habit) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Creates every habit in order, returning one identifier per input.
    async fn insert_all(&self, habits: &[Habit]) -> Result<Vec<i64>>;

    async fn clear_all(&self) -> Result<()>;

    /// Moves a habit to `new_position`, shifting the ones in between.
    async fn reorder(&self, id: i64, new_position: i64) -> Result<()>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Event>>;

    async fn find(&self, habit_id: i64, date: NaiveDate) -> Result<Option<Event>>;

    /// Events of one habit, ascending by date.
    async fn get_for_habit(&self, habit_id: i64) -> Result<Vec<Event>>;

    async fn get_map_for_habit(&self, habit_id: i64)
        -> Result<BTreeMap<NaiveDate, EventPayload>>;

    /// Inserts or overwrites the event at `(habit_id, date)`.
    async fn insert_event(&self, event: &Event) -> Result<()>;

    /// Inserts many events for one habit; for repeated dates the last entry wins.
    async fn insert_events(
        &self,
        habit_id: i64,
        entries: &[(NaiveDate, EventPayload)],
    ) -> Result<()>;

    async fn delete_event(&self, habit_id: i64, date: NaiveDate) -> Result<()>;

    async fn delete_for_habit(&self, habit_id: i64) -> Result<()>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Category>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn create(&self, category: &Category) -> Result<i64>;

    async fn update(&self, category: &Category) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn get_for_habit(&self, habit_id: i64) -> Result<Vec<Category>>;

    /// Makes `category_ids` the exact set of categories containing the habit.
    async fn set_categories_for_habit(&self, habit_id: i64, category_ids: &[i64]) -> Result<()>;
}

#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Rule>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Rule>>;

    async fn get_for_habit(&self, habit: &str) -> Result<Vec<Rule>>;

    async fn create(&self, rule: &Rule) -> Result<i64>;

    async fn update(&self, rule: &Rule) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn delete_for_habit(&self, habit: &str) -> Result<()>;
}

#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Log>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Log>>;

    async fn get_for_habit(&self, habit: &str) -> Result<Vec<Log>>;

    async fn create(&self, log: &Log) -> Result<i64>;

    async fn update(&self, log: &Log) -> Result<()>;

    async fn update_field(&self, id: i64, field: LogField, value: &str) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;
}
