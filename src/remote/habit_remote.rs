use async_trait::async_trait;

use super::client::RemoteClient;
use super::resolve_unique;
use super::schema::{narrow_habit, widen_habit, HabitsEnvelope, RemoteHabit};
use crate::models::Habit;
use crate::repository::{existing_id, HabitRepository, RepositoryError, Result};

/// A habit the remote service accepted but whose identifier is not known yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHabit {
    pub title: String,
}

/// Habits over HTTP.
///
/// The service keys habits by title: creation returns no identifier and
/// deletion takes a name. Identifiers are recovered by listing the whole
/// collection and matching on title, which is ambiguous when titles repeat.
pub struct RemoteHabitRepository {
    client: RemoteClient,
}

impl RemoteHabitRepository {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    async fn fetch_all(&self) -> Result<Vec<RemoteHabit>> {
        let envelope: HabitsEnvelope = self.client.get("habits", &[]).await?;
        Ok(envelope.habits)
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<RemoteHabit>> {
        Ok(self
            .fetch_all()
            .await?
            .into_iter()
            .find(|h| h.habit_id == Some(id)))
    }

    /// First phase of creation: submit the habit.
    pub async fn submit_create(&self, habit: &Habit) -> Result<PendingHabit> {
        let remote = narrow_habit(habit);
        self.client
            .post(
                "habits/add",
                &[
                    ("name", remote.name.clone()),
                    ("device", remote.is_device.to_string()),
                ],
                None,
            )
            .await?;
        Ok(PendingHabit { title: remote.name })
    }

    /// Second phase of creation: find the identifier the service assigned.
    ///
    /// Returns [`crate::repository::UNRESOLVED_ID`] unless exactly one remote
    /// habit carries the submitted title.
    pub async fn resolve_identity(&self, pending: &PendingHabit) -> Result<i64> {
        let habits = self.fetch_all().await?;
        let candidates = habits
            .iter()
            .filter(|h| h.name == pending.title)
            .map(|h| h.habit_id);
        Ok(resolve_unique(
            candidates,
            &format!("habit '{}'", pending.title),
        ))
    }

    async fn update_field(&self, name: &str, field: &str, value: String) -> Result<()> {
        self.client
            .post(
                "habits/update",
                &[
                    ("name", name.to_string()),
                    ("field", field.to_string()),
                    ("value", value),
                ],
                None,
            )
            .await
    }

    async fn delete_by_name(&self, name: &str) -> Result<()> {
        self.client
            .post("habits/delete", &[("name", name.to_string())], None)
            .await
    }
}

#[async_trait]
impl HabitRepository for RemoteHabitRepository {
    async fn get_all(&self) -> Result<Vec<Habit>> {
        Ok(self.fetch_all().await?.into_iter().map(widen_habit).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Habit>> {
        Ok(self.fetch_by_id(id).await?.map(widen_habit))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Habit>> {
        Ok(self
            .fetch_all()
            .await?
            .into_iter()
            .find(|h| h.name == title)
            .map(widen_habit))
    }

    async fn create(&self, habit: &Habit) -> Result<i64> {
        let pending = self.submit_create(habit).await?;
        self.resolve_identity(&pending).await
    }

    async fn update(&self, habit: &Habit) -> Result<()> {
        let id = existing_id(habit.id, "Habit")?;
        let current = self
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Habit", id))?;
        let wanted = narrow_habit(habit);

        // Updates are keyed by the current title, so rename last.
        if wanted.is_device != current.is_device {
            self.update_field(&current.name, "is_device", wanted.is_device.to_string())
                .await?;
        }
        if wanted.name != current.name {
            self.update_field(&current.name, "name", wanted.name).await?;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.fetch_by_id(id).await? {
            Some(habit) => self.delete_by_name(&habit.name).await,
            None => {
                tracing::debug!("Habit {} not on remote; nothing to delete", id);
                Ok(())
            }
        }
    }

    async fn insert_all(&self, habits: &[Habit]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(habits.len());
        for habit in habits {
            ids.push(self.create(habit).await?);
        }
        Ok(ids)
    }

    async fn clear_all(&self) -> Result<()> {
        // A delete by name removes every habit sharing that name.
        let mut names: Vec<String> = self.fetch_all().await?.into_iter().map(|h| h.name).collect();
        names.sort();
        names.dedup();
        for name in names {
            self.delete_by_name(&name).await?;
        }
        Ok(())
    }

    async fn reorder(&self, id: i64, new_position: i64) -> Result<()> {
        // The service stores no order; positions live in memory only.
        tracing::debug!(
            "Ignoring reorder of habit {} to {} on remote store",
            id,
            new_position
        );
        Ok(())
    }
}
