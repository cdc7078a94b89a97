use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::{format_date, parse_date};
use crate::models::{Event, Habit, HabitKind};
use crate::repository::{existing_id, HabitRepository, RepositoryError, Result};

pub struct LocalHabitRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct HabitRow {
    id: i64,
    title: String,
    position: i64,
    kind: String,
    target_value: f64,
    partial_value: f64,
    unit: String,
    archived: bool,
    reminder: Option<String>,
    reminder_days: i64,
    cue: String,
    reward: String,
    description: String,
    two_day_rule: bool,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    habit_id: i64,
    date: String,
    progress: f64,
    note: Option<String>,
}

impl LocalHabitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert(tx: &mut Transaction<'_, Sqlite>, habit: &Habit) -> Result<i64> {
        let reminder = habit.reminder.map(|t| t.format("%H:%M").to_string());

        let result = sqlx::query(
            r#"
            INSERT INTO habits (title, position, kind, target_value, partial_value, unit, archived,
                                reminder, reminder_days, cue, reward, description, two_day_rule)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&habit.title)
        .bind(habit.position)
        .bind(habit.kind.to_string())
        .bind(habit.target_value)
        .bind(habit.partial_value)
        .bind(&habit.unit)
        .bind(habit.archived)
        .bind(&reminder)
        .bind(habit.reminder_days as i64)
        .bind(&habit.cue)
        .bind(&habit.reward)
        .bind(&habit.description)
        .bind(habit.two_day_rule)
        .execute(&mut **tx)
        .await?;

        let id = result.last_insert_rowid();
        Self::replace_links(tx, id, &habit.category_ids).await?;

        for event in &habit.events {
            sqlx::query(
                "INSERT OR REPLACE INTO events (habit_id, date, progress, note) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(format_date(event.date))
            .bind(event.progress)
            .bind(&event.note)
            .execute(&mut **tx)
            .await?;
        }

        Ok(id)
    }

    async fn replace_links(
        tx: &mut Transaction<'_, Sqlite>,
        habit_id: i64,
        category_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM habit_categories WHERE habit_id = ?")
            .bind(habit_id)
            .execute(&mut **tx)
            .await?;

        for category_id in category_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO habit_categories (habit_id, category_id) VALUES (?, ?)",
            )
            .bind(habit_id)
            .bind(category_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn hydrate_habit(&self, row: HabitRow) -> Result<Habit> {
        let category_ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT category_id FROM habit_categories WHERE habit_id = ? ORDER BY category_id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let event_rows: Vec<EventRow> = sqlx::query_as(
            "SELECT habit_id, date, progress, note FROM events WHERE habit_id = ? ORDER BY date",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(event_rows.len());
        for e in event_rows {
            events.push(Event {
                habit_id: e.habit_id,
                date: parse_date(&e.date)?,
                progress: e.progress,
                note: e.note,
            });
        }

        let reminder = match row.reminder.as_deref() {
            Some(s) => Some(NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| {
                RepositoryError::SchemaMismatch(format!("invalid stored reminder '{}'", s))
            })?),
            None => None,
        };
        let kind = row
            .kind
            .parse::<HabitKind>()
            .map_err(RepositoryError::SchemaMismatch)?;

        Ok(Habit {
            id: Some(row.id),
            title: row.title,
            position: row.position,
            kind,
            target_value: row.target_value,
            partial_value: row.partial_value,
            unit: row.unit,
            archived: row.archived,
            reminder,
            reminder_days: row.reminder_days as u8,
            cue: row.cue,
            reward: row.reward,
            description: row.description,
            two_day_rule: row.two_day_rule,
            category_ids: category_ids.into_iter().map(|(id,)| id).collect(),
            events,
        })
    }
}

#[async_trait]
impl HabitRepository for LocalHabitRepository {
    async fn get_all(&self) -> Result<Vec<Habit>> {
        let rows: Vec<HabitRow> = sqlx::query_as("SELECT * FROM habits ORDER BY position, id")
            .fetch_all(&self.pool)
            .await?;

        let mut habits = Vec::with_capacity(rows.len());
        for row in rows {
            habits.push(self.hydrate_habit(row).await?);
        }
        Ok(habits)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Habit>> {
        let row: Option<HabitRow> = sqlx::query_as("SELECT * FROM habits WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => self.hydrate_habit(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Habit>> {
        let row: Option<HabitRow> =
            sqlx::query_as("SELECT * FROM habits WHERE title = ? ORDER BY id LIMIT 1")
                .bind(title)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => self.hydrate_habit(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn create(&self, habit: &Habit) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let id = Self::insert(&mut tx, habit).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update(&self, habit: &Habit) -> Result<()> {
        let id = existing_id(habit.id, "Habit")?;
        let reminder = habit.reminder.map(|t| t.format("%H:%M").to_string());

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE habits
            SET title = ?, position = ?, kind = ?, target_value = ?, partial_value = ?, unit = ?,
                archived = ?, reminder = ?, reminder_days = ?, cue = ?, reward = ?,
                description = ?, two_day_rule = ?
            WHERE id = ?
            "#,
        )
        .bind(&habit.title)
        .bind(habit.position)
        .bind(habit.kind.to_string())
        .bind(habit.target_value)
        .bind(habit.partial_value)
        .bind(&habit.unit)
        .bind(habit.archived)
        .bind(&reminder)
        .bind(habit.reminder_days as i64)
        .bind(&habit.cue)
        .bind(&habit.reward)
        .bind(&habit.description)
        .bind(habit.two_day_rule)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Habit", id));
        }

        Self::replace_links(&mut tx, id, &habit.category_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in [
            "DELETE FROM events WHERE habit_id = ?",
            "DELETE FROM habit_categories WHERE habit_id = ?",
            "DELETE FROM habits WHERE id = ?",
        ] {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_all(&self, habits: &[Habit]) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(habits.len());
        for habit in habits {
            ids.push(Self::insert(&mut tx, habit).await?);
        }
        tx.commit().await?;
        Ok(ids)
    }

    async fn clear_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in [
            "DELETE FROM events",
            "DELETE FROM habit_categories",
            "DELETE FROM habits",
        ] {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn reorder(&self, id: i64, new_position: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(i64,)> = sqlx::query_as("SELECT position FROM habits WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let (current,) = current.ok_or_else(|| RepositoryError::not_found("Habit", id))?;

        if new_position > current {
            sqlx::query(
                "UPDATE habits SET position = position - 1 WHERE position > ? AND position <= ?",
            )
            .bind(current)
            .bind(new_position)
            .execute(&mut *tx)
            .await?;
        } else if new_position < current {
            sqlx::query(
                "UPDATE habits SET position = position + 1 WHERE position >= ? AND position < ?",
            )
            .bind(new_position)
            .bind(current)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE habits SET position = ? WHERE id = ?")
            .bind(new_position)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
