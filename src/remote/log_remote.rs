use async_trait::async_trait;
use std::collections::HashSet;

use super::client::RemoteClient;
use super::resolve_unique;
use super::schema::{narrow_log, widen_log, RemoteLog, ResultEnvelope};
use crate::models::{Log, LogField};
use crate::repository::{existing_id, LogRepository, RepositoryError, Result};

/// A log the remote service accepted, with the ids that existed before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLog {
    pub log: Log,
    pub known_ids: HashSet<i64>,
}

/// Habit logs over HTTP.
///
/// The service creates logs without returning an id and updates them one field
/// per request.
pub struct RemoteLogRepository {
    client: RemoteClient,
}

impl RemoteLogRepository {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    /// An empty name lists every log.
    async fn fetch(&self, name: &str) -> Result<Vec<Log>> {
        let envelope: ResultEnvelope<RemoteLog> = self
            .client
            .get("logs", &[("name", name.to_string())])
            .await?;
        Ok(envelope.result.into_iter().map(widen_log).collect())
    }

    async fn send_field(&self, id: i64, field: LogField, value: &str) -> Result<()> {
        self.client
            .post(
                "logs/update",
                &[
                    ("id", id.to_string()),
                    ("field", field.to_string()),
                    ("value", value.to_string()),
                ],
                None,
            )
            .await
    }

    pub async fn submit_create(&self, log: &Log) -> Result<PendingLog> {
        let known_ids = self
            .fetch(&log.habit)
            .await?
            .into_iter()
            .filter_map(|l| l.id)
            .collect();

        let remote = narrow_log(log);
        self.client
            .post(
                "logs/add",
                &[
                    ("name", remote.name),
                    ("state", remote.state),
                    ("reported", remote.reported.to_string()),
                ],
                None,
            )
            .await?;

        Ok(PendingLog {
            log: log.clone(),
            known_ids,
        })
    }

    /// Diffs the listing against the snapshot taken before submission.
    pub async fn resolve_identity(&self, pending: &PendingLog) -> Result<i64> {
        let logs = self.fetch(&pending.log.habit).await?;
        let candidates = logs
            .iter()
            .filter(|l| l.id.map_or(true, |id| !pending.known_ids.contains(&id)))
            .map(|l| l.id);
        Ok(resolve_unique(
            candidates,
            &format!("log for '{}'", pending.log.habit),
        ))
    }
}

#[async_trait]
impl LogRepository for RemoteLogRepository {
    async fn get_all(&self) -> Result<Vec<Log>> {
        self.fetch("").await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Log>> {
        Ok(self.fetch("").await?.into_iter().find(|l| l.id == Some(id)))
    }

    async fn get_for_habit(&self, habit: &str) -> Result<Vec<Log>> {
        Ok(self
            .fetch(habit)
            .await?
            .into_iter()
            .filter(|l| l.habit == habit)
            .collect())
    }

    async fn create(&self, log: &Log) -> Result<i64> {
        let pending = self.submit_create(log).await?;
        self.resolve_identity(&pending).await
    }

    async fn update(&self, log: &Log) -> Result<()> {
        let id = existing_id(log.id, "Log")?;
        let stored = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Log", id))?;

        for (field, value) in log.changed_fields(&stored) {
            self.send_field(id, field, &value).await?;
        }
        Ok(())
    }

    async fn update_field(&self, id: i64, field: LogField, value: &str) -> Result<()> {
        let mut stored = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Log", id))?;
        stored.apply(field, value).map_err(RepositoryError::SchemaMismatch)?;

        self.send_field(id, field, value).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if self.find_by_id(id).await?.is_none() {
            tracing::debug!("Log {} not on remote; nothing to delete", id);
            return Ok(());
        }
        self.client
            .post("logs/delete", &[("id", id.to_string())], None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::FakeBackend;
    use crate::repository::UNRESOLVED_ID;
    use std::sync::Arc;

    fn setup() -> (Arc<FakeBackend>, RemoteLogRepository) {
        let fake = Arc::new(FakeBackend::new("alice"));
        let repo = RemoteLogRepository::new(RemoteClient::new(fake.clone(), "alice"));
        (fake, repo)
    }

    #[tokio::test]
    async fn test_create_resolves_new_id_even_with_same_values() {
        let (_fake, repo) = setup();

        let first = repo.create(&Log::new("Run", "done", true)).await.unwrap();
        let second = repo.create(&Log::new("Run", "done", true)).await.unwrap();

        assert_ne!(first, UNRESOLVED_ID);
        assert_ne!(second, UNRESOLVED_ID);
        assert_ne!(first, second);
        assert_eq!(repo.get_for_habit("Run").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_unresolved() {
        let (_fake, repo) = setup();

        let a = repo.submit_create(&Log::new("Run", "a", true)).await.unwrap();
        let b = repo.submit_create(&Log::new("Run", "b", true)).await.unwrap();

        // `b` saw `a` in its snapshot, `a` sees both new records.
        assert_eq!(repo.resolve_identity(&a).await.unwrap(), UNRESOLVED_ID);
        assert_ne!(repo.resolve_identity(&b).await.unwrap(), UNRESOLVED_ID);
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let (fake, repo) = setup();

        let id = repo.create(&Log::new("Run", "started", true)).await.unwrap();
        let mut log = repo.find_by_id(id).await.unwrap().unwrap();
        log.state = "done".to_string();
        repo.update(&log).await.unwrap();

        let updates: Vec<_> = fake
            .requests()
            .into_iter()
            .filter(|r| r.path == "/alice/logs/update")
            .collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].query_param("field"), Some("state"));
        assert_eq!(updates[0].query_param("value"), Some("done"));
        assert_eq!(repo.find_by_id(id).await.unwrap().unwrap().state, "done");
    }

    #[tokio::test]
    async fn test_update_field_validation_and_missing() {
        let (fake, repo) = setup();
        let id = repo.create(&Log::new("Run", "done", true)).await.unwrap();

        let err = repo
            .update_field(id, LogField::SelfReported, "maybe")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::SchemaMismatch(_)));
        assert!(fake
            .requests()
            .iter()
            .all(|r| r.path != "/alice/logs/update"));

        repo.update_field(id, LogField::SelfReported, "false")
            .await
            .unwrap();
        assert!(!repo.find_by_id(id).await.unwrap().unwrap().self_reported);

        assert!(repo
            .update_field(id + 50, LogField::State, "x")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (fake, repo) = setup();
        let id = repo.create(&Log::new("Run", "done", true)).await.unwrap();

        repo.delete(id).await.unwrap();
        repo.delete(id).await.unwrap();

        assert!(repo.get_all().await.unwrap().is_empty());
        let deletes = fake
            .requests()
            .iter()
            .filter(|r| r.path == "/alice/logs/delete")
            .count();
        assert_eq!(deletes, 1);
    }
}
