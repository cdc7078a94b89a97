use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::collections::BTreeMap;

use super::{format_date, parse_date};
use crate::models::{dedupe_by_date, Event, EventPayload};
use crate::repository::{EventRepository, Result};

const UPSERT_EVENT: &str = r#"
    INSERT INTO events (habit_id, date, progress, note) VALUES (?, ?, ?, ?)
    ON CONFLICT(habit_id, date) DO UPDATE SET progress = excluded.progress, note = excluded.note
"#;

pub struct LocalEventRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    habit_id: i64,
    date: String,
    progress: f64,
    note: Option<String>,
}

impl EventRow {
    fn into_event(self) -> Result<Event> {
        Ok(Event {
            habit_id: self.habit_id,
            date: parse_date(&self.date)?,
            progress: self.progress,
            note: self.note,
        })
    }
}

impl LocalEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for LocalEventRepository {
    async fn get_all(&self) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as("SELECT * FROM events ORDER BY habit_id, date")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(EventRow::into_event).collect()
    }

    async fn find(&self, habit_id: i64, date: NaiveDate) -> Result<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as("SELECT * FROM events WHERE habit_id = ? AND date = ?")
                .bind(habit_id)
                .bind(format_date(date))
                .fetch_optional(&self.pool)
                .await?;
        row.map(EventRow::into_event).transpose()
    }

    async fn get_for_habit(&self, habit_id: i64) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> =
            sqlx::query_as("SELECT * FROM events WHERE habit_id = ? ORDER BY date")
                .bind(habit_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(EventRow::into_event).collect()
    }

    async fn get_map_for_habit(
        &self,
        habit_id: i64,
    ) -> Result<BTreeMap<NaiveDate, EventPayload>> {
        Ok(self
            .get_for_habit(habit_id)
            .await?
            .into_iter()
            .map(|e| (e.date, e.payload()))
            .collect())
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        sqlx::query(UPSERT_EVENT)
            .bind(event.habit_id)
            .bind(format_date(event.date))
            .bind(event.progress)
            .bind(&event.note)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_events(
        &self,
        habit_id: i64,
        entries: &[(NaiveDate, EventPayload)],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (date, payload) in dedupe_by_date(entries) {
            sqlx::query(UPSERT_EVENT)
                .bind(habit_id)
                .bind(format_date(date))
                .bind(payload.progress)
                .bind(&payload.note)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_event(&self, habit_id: i64, date: NaiveDate) -> Result<()> {
        sqlx::query("DELETE FROM events WHERE habit_id = ? AND date = ?")
            .bind(habit_id)
            .bind(format_date(date))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_for_habit(&self, habit_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM events WHERE habit_id = ?")
            .bind(habit_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn payload(progress: f64) -> EventPayload {
        EventPayload {
            progress,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_insert_event_overwrites_same_date() {
        let db = setup().await;
        let repo = LocalEventRepository::new(db.pool.clone());

        repo.insert_event(&Event::new(1, day(3), 1.0)).await.unwrap();
        repo.insert_event(&Event::new(1, day(3), 5.0).with_note("more"))
            .await
            .unwrap();

        let events = repo.get_for_habit(1).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].progress, 5.0);
        assert_eq!(events[0].note.as_deref(), Some("more"));
    }

    #[tokio::test]
    async fn test_get_for_habit_is_sorted_and_scoped() {
        let db = setup().await;
        let repo = LocalEventRepository::new(db.pool.clone());

        repo.insert_event(&Event::new(1, day(20), 1.0)).await.unwrap();
        repo.insert_event(&Event::new(1, day(4), 1.0)).await.unwrap();
        repo.insert_event(&Event::new(2, day(1), 1.0)).await.unwrap();

        let dates: Vec<NaiveDate> = repo
            .get_for_habit(1)
            .await
            .unwrap()
            .iter()
            .map(|e| e.date)
            .collect();
        assert_eq!(dates, vec![day(4), day(20)]);
        assert_eq!(repo.get_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_insert_events_last_duplicate_wins() {
        let db = setup().await;
        let repo = LocalEventRepository::new(db.pool.clone());

        repo.insert_events(
            7,
            &[
                (day(10), payload(1.0)),
                (day(2), payload(2.0)),
                (day(10), payload(9.0)),
            ],
        )
        .await
        .unwrap();

        let map = repo.get_map_for_habit(7).await.unwrap();
        let keys: Vec<NaiveDate> = map.keys().copied().collect();
        assert_eq!(keys, vec![day(2), day(10)]);
        assert_eq!(map[&day(10)].progress, 9.0);
    }

    #[tokio::test]
    async fn test_delete_event_missing_is_noop() {
        let db = setup().await;
        let repo = LocalEventRepository::new(db.pool.clone());

        repo.delete_event(1, day(1)).await.unwrap();

        repo.insert_event(&Event::new(1, day(1), 1.0)).await.unwrap();
        repo.delete_event(1, day(1)).await.unwrap();
        assert!(repo.find(1, day(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_for_habit() {
        let db = setup().await;
        let repo = LocalEventRepository::new(db.pool.clone());

        repo.insert_events(3, &[(day(1), payload(1.0)), (day(2), payload(1.0))])
            .await
            .unwrap();
        repo.insert_event(&Event::new(4, day(1), 1.0)).await.unwrap();

        repo.delete_for_habit(3).await.unwrap();

        assert!(repo.get_for_habit(3).await.unwrap().is_empty());
        assert_eq!(repo.get_for_habit(4).await.unwrap().len(), 1);
    }
}
