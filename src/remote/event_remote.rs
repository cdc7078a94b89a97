use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::client::{to_body, RemoteClient};
use super::schema::{
    narrow_event, widen_event, EventKey, EventMapEnvelope, EventsEnvelope, HabitsEnvelope,
};
use crate::models::{dedupe_by_date, Event, EventPayload};
use crate::repository::{EventRepository, Result};

/// Events over HTTP.
///
/// The service lists events per habit only, and has no endpoint to clear a
/// habit's events; both are emulated with one request per habit or per date.
pub struct RemoteEventRepository {
    client: RemoteClient,
}

impl RemoteEventRepository {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventRepository for RemoteEventRepository {
    async fn get_all(&self) -> Result<Vec<Event>> {
        let habits: HabitsEnvelope = self.client.get("habits", &[]).await?;

        let mut events = Vec::new();
        for habit_id in habits.habits.into_iter().filter_map(|h| h.habit_id) {
            events.extend(self.get_for_habit(habit_id).await?);
        }
        Ok(events)
    }

    async fn find(&self, habit_id: i64, date: NaiveDate) -> Result<Option<Event>> {
        Ok(self
            .get_for_habit(habit_id)
            .await?
            .into_iter()
            .find(|e| e.date == date))
    }

    async fn get_for_habit(&self, habit_id: i64) -> Result<Vec<Event>> {
        let envelope: EventsEnvelope = self
            .client
            .get(&format!("events/habit/{}", habit_id), &[])
            .await?;

        // One event per date, ascending, whatever order the service used.
        let by_date: BTreeMap<NaiveDate, Event> = envelope
            .events
            .into_iter()
            .map(|e| (e.date, widen_event(e)))
            .collect();
        Ok(by_date.into_values().collect())
    }

    async fn get_map_for_habit(
        &self,
        habit_id: i64,
    ) -> Result<BTreeMap<NaiveDate, EventPayload>> {
        let envelope: EventMapEnvelope = self
            .client
            .get(&format!("events/habit/{}/map", habit_id), &[])
            .await?;
        Ok(envelope.events)
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        let body = to_body(&narrow_event(event))?;
        self.client.post("events/add", &[], Some(body)).await
    }

    async fn insert_events(
        &self,
        habit_id: i64,
        entries: &[(NaiveDate, EventPayload)],
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let body = to_body(&EventMapEnvelope {
            events: dedupe_by_date(entries),
        })?;
        self.client
            .post(&format!("events/habit/{}/batch", habit_id), &[], Some(body))
            .await
    }

    async fn delete_event(&self, habit_id: i64, date: NaiveDate) -> Result<()> {
        let body = to_body(&EventKey { habit_id, date })?;
        self.client.post("events/delete", &[], Some(body)).await
    }

    async fn delete_for_habit(&self, habit_id: i64) -> Result<()> {
        for event in self.get_for_habit(habit_id).await? {
            self.delete_event(habit_id, event.date).await?;
        }
        Ok(())
    }
}
