use async_trait::async_trait;

use super::client::RemoteClient;
use super::resolve_unique;
use super::schema::{narrow_rule, widen_rule, RemoteRule, ResultEnvelope};
use crate::models::Rule;
use crate::repository::{existing_id, RepositoryError, Result, RuleRepository};

/// A rule the remote service accepted but whose identifier is not known yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRule {
    pub rule: Rule,
}

/// Reminder rules over HTTP, keyed by habit title on the wire.
pub struct RemoteRuleRepository {
    client: RemoteClient,
}

fn slot_query(rule: &RemoteRule) -> Vec<(&'static str, String)> {
    vec![
        ("habit", rule.habit.clone()),
        ("day", rule.day.to_string()),
        ("hour", rule.hour.to_string()),
        ("minute", rule.minute.to_string()),
    ]
}

impl RemoteRuleRepository {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    async fn fetch_all(&self) -> Result<Vec<Rule>> {
        let envelope: ResultEnvelope<RemoteRule> = self.client.get("rules", &[]).await?;
        envelope.result.into_iter().map(widen_rule).collect()
    }

    pub async fn submit_create(&self, rule: &Rule) -> Result<PendingRule> {
        let remote = narrow_rule(rule);
        let mut query = slot_query(&remote);
        query.push(("active", remote.active.to_string()));
        self.client.post("rules/add", &query, None).await?;
        Ok(PendingRule { rule: rule.clone() })
    }

    /// Matches the submitted slot against the listing; ambiguous or missing
    /// matches give [`crate::repository::UNRESOLVED_ID`].
    pub async fn resolve_identity(&self, pending: &PendingRule) -> Result<i64> {
        let rules = self.fetch_all().await?;
        let candidates = rules
            .iter()
            .filter(|r| r.same_slot(&pending.rule))
            .map(|r| r.id);
        Ok(resolve_unique(
            candidates,
            &format!("rule for '{}'", pending.rule.habit),
        ))
    }
}

#[async_trait]
impl RuleRepository for RemoteRuleRepository {
    async fn get_all(&self) -> Result<Vec<Rule>> {
        self.fetch_all().await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Rule>> {
        Ok(self.fetch_all().await?.into_iter().find(|r| r.id == Some(id)))
    }

    async fn get_for_habit(&self, habit: &str) -> Result<Vec<Rule>> {
        Ok(self
            .fetch_all()
            .await?
            .into_iter()
            .filter(|r| r.habit == habit)
            .collect())
    }

    async fn create(&self, rule: &Rule) -> Result<i64> {
        let pending = self.submit_create(rule).await?;
        self.resolve_identity(&pending).await
    }

    async fn update(&self, rule: &Rule) -> Result<()> {
        let id = existing_id(rule.id, "Rule")?;
        if self.find_by_id(id).await?.is_none() {
            return Err(RepositoryError::not_found("Rule", id));
        }

        let remote = narrow_rule(rule);
        let mut query = vec![("id", id.to_string())];
        query.extend(slot_query(&remote));
        query.push(("active", remote.active.to_string()));
        self.client.post("rules/update", &query, None).await
    }

    /// Deletes by slot, since the service has no delete-by-id for rules.
    ///
    /// Relies on the service honouring `day`, `hour` and `minute`. One that
    /// only reads `habit` would drop every rule of that habit, the same
    /// request `delete_for_habit` sends.
    async fn delete(&self, id: i64) -> Result<()> {
        match self.find_by_id(id).await? {
            Some(rule) => {
                self.client
                    .post("rules/delete", &slot_query(&narrow_rule(&rule)), None)
                    .await
            }
            None => {
                tracing::debug!("Rule {} not on remote; nothing to delete", id);
                Ok(())
            }
        }
    }

    async fn delete_for_habit(&self, habit: &str) -> Result<()> {
        self.client
            .post("rules/delete", &[("habit", habit.to_string())], None)
            .await
    }
}
