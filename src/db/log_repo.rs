use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{Log, LogField};
use crate::repository::{existing_id, LogRepository, RepositoryError, Result};

pub struct LocalLogRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    habit: String,
    state: String,
    self_reported: bool,
}

impl From<LogRow> for Log {
    fn from(row: LogRow) -> Self {
        Log {
            id: Some(row.id),
            habit: row.habit,
            state: row.state,
            self_reported: row.self_reported,
        }
    }
}

impl LocalLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogRepository for LocalLogRepository {
    async fn get_all(&self) -> Result<Vec<Log>> {
        let rows: Vec<LogRow> =
            sqlx::query_as("SELECT id, habit, state, self_reported FROM logs ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Log::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Log>> {
        let row: Option<LogRow> =
            sqlx::query_as("SELECT id, habit, state, self_reported FROM logs WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Log::from))
    }

    async fn get_for_habit(&self, habit: &str) -> Result<Vec<Log>> {
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT id, habit, state, self_reported FROM logs WHERE habit = ? ORDER BY id",
        )
        .bind(habit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Log::from).collect())
    }

    async fn create(&self, log: &Log) -> Result<i64> {
        let id = sqlx::query(
            "INSERT INTO logs (habit, state, self_reported, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&log.habit)
        .bind(&log.state)
        .bind(log.self_reported)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn update(&self, log: &Log) -> Result<()> {
        let id = existing_id(log.id, "Log")?;
        let result =
            sqlx::query("UPDATE logs SET habit = ?, state = ?, self_reported = ? WHERE id = ?")
                .bind(&log.habit)
                .bind(&log.state)
                .bind(log.self_reported)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Log", id));
        }
        Ok(())
    }

    async fn update_field(&self, id: i64, field: LogField, value: &str) -> Result<()> {
        let mut log = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Log", id))?;
        log.apply(field, value)
            .map_err(RepositoryError::SchemaMismatch)?;
        self.update(&log).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM logs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
