use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::models::{weekday_from_index, weekday_index, Rule};
use crate::repository::{existing_id, RepositoryError, Result, RuleRepository};

pub struct LocalRuleRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    id: i64,
    habit: String,
    day: i64,
    hour: i64,
    minute: i64,
    active: bool,
}

impl RuleRow {
    fn into_rule(self) -> Result<Rule> {
        let day = u8::try_from(self.day)
            .ok()
            .and_then(weekday_from_index)
            .ok_or_else(|| {
                RepositoryError::SchemaMismatch(format!("invalid stored weekday {}", self.day))
            })?;
        Ok(Rule {
            id: Some(self.id),
            habit: self.habit,
            day,
            hour: self.hour as u8,
            minute: self.minute as u8,
            active: self.active,
        })
    }
}

impl LocalRuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for LocalRuleRepository {
    async fn get_all(&self) -> Result<Vec<Rule>> {
        let rows: Vec<RuleRow> =
            sqlx::query_as("SELECT * FROM rules ORDER BY habit, day, hour, minute")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(RuleRow::into_rule).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Rule>> {
        let row: Option<RuleRow> = sqlx::query_as("SELECT * FROM rules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(RuleRow::into_rule).transpose()
    }

    async fn get_for_habit(&self, habit: &str) -> Result<Vec<Rule>> {
        let rows: Vec<RuleRow> =
            sqlx::query_as("SELECT * FROM rules WHERE habit = ? ORDER BY day, hour, minute")
                .bind(habit)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(RuleRow::into_rule).collect()
    }

    async fn create(&self, rule: &Rule) -> Result<i64> {
        let id = sqlx::query(
            "INSERT INTO rules (habit, day, hour, minute, active) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&rule.habit)
        .bind(weekday_index(rule.day) as i64)
        .bind(rule.hour as i64)
        .bind(rule.minute as i64)
        .bind(rule.active)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn update(&self, rule: &Rule) -> Result<()> {
        let id = existing_id(rule.id, "Rule")?;
        let result = sqlx::query(
            "UPDATE rules SET habit = ?, day = ?, hour = ?, minute = ?, active = ? WHERE id = ?",
        )
        .bind(&rule.habit)
        .bind(weekday_index(rule.day) as i64)
        .bind(rule.hour as i64)
        .bind(rule.minute as i64)
        .bind(rule.active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Rule", id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM rules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_for_habit(&self, habit: &str) -> Result<()> {
        sqlx::query("DELETE FROM rules WHERE habit = ?")
            .bind(habit)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
