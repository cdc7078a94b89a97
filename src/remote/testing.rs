//! In-memory stand-in for the remote service, used by the adapter tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::schema::{EventMapEnvelope, RemoteCategory, RemoteEvent, RemoteLog, RemoteRule};
use super::transport::{HttpRequest, HttpResponse, Method, Transport};
use crate::models::EventPayload;
use crate::repository::Result;

struct StoredHabit {
    id: Value,
    name: String,
    is_device: bool,
}

#[derive(Default)]
struct State {
    habits: Vec<StoredHabit>,
    events: BTreeMap<(i64, NaiveDate), EventPayload>,
    categories: Vec<RemoteCategory>,
    rules: Vec<RemoteRule>,
    logs: Vec<RemoteLog>,
    next_id: i64,
    requests: Vec<HttpRequest>,
    failures: Vec<(Method, String, u16)>,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Deserialize)]
struct DeleteKey {
    habit_id: i64,
    date: NaiveDate,
}

type Handled = std::result::Result<String, (u16, String)>;

fn bad_request(message: impl Into<String>) -> (u16, String) {
    (400, message.into())
}

fn not_found(message: impl Into<String>) -> (u16, String) {
    (404, message.into())
}

fn param<'a>(request: &'a HttpRequest, name: &str) -> std::result::Result<&'a str, (u16, String)> {
    request
        .query_param(name)
        .ok_or_else(|| bad_request(format!("missing parameter '{}'", name)))
}

fn parsed<T: std::str::FromStr>(
    request: &HttpRequest,
    name: &str,
) -> std::result::Result<T, (u16, String)> {
    param(request, name)?
        .parse()
        .map_err(|_| bad_request(format!("invalid parameter '{}'", name)))
}

fn body<T: serde::de::DeserializeOwned>(request: &HttpRequest) -> std::result::Result<T, (u16, String)> {
    let value = request
        .body
        .clone()
        .ok_or_else(|| bad_request("missing body"))?;
    serde_json::from_value(value).map_err(|e| bad_request(e.to_string()))
}

/// A fake service scoped to one user.
///
/// Habit ids are handed out as numeric strings, which the adapters must accept.
pub struct FakeBackend {
    prefix: String,
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new(user: &str) -> Self {
        Self {
            prefix: format!("/{}/", urlencoding::encode(user)),
            state: Mutex::new(State::default()),
        }
    }

    /// Adds a habit with an arbitrary JSON id, bypassing the add endpoint.
    pub fn seed_habit(&self, id: Value, name: &str, is_device: bool) {
        self.state.lock().unwrap().habits.push(StoredHabit {
            id,
            name: name.to_string(),
            is_device,
        });
    }

    /// Makes the next matching request answer `status` without touching state.
    pub fn fail_next(&self, method: Method, suffix: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((method, suffix.to_string(), status));
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    fn handle(state: &mut State, method: Method, route: &str, request: &HttpRequest) -> Handled {
        let segments: Vec<&str> = route.split('/').collect();

        match (method, segments.as_slice()) {
            (Method::Get, ["habits"]) => {
                let habits: Vec<Value> = state
                    .habits
                    .iter()
                    .map(|h| json!({"habit_id": h.id, "name": h.name, "is_device": h.is_device}))
                    .collect();
                Ok(json!({ "habits": habits }).to_string())
            }
            (Method::Post, ["habits", "add"]) => {
                let name = param(request, "name")?.to_string();
                let is_device = parsed(request, "device")?;
                let id = state.allocate_id();
                state.habits.push(StoredHabit {
                    id: Value::String(id.to_string()),
                    name,
                    is_device,
                });
                Ok("{}".to_string())
            }
            (Method::Post, ["habits", "update"]) => {
                let name = param(request, "name")?;
                let field = param(request, "field")?;
                let value = param(request, "value")?;
                if !state.habits.iter().any(|h| h.name == name) {
                    return Err(not_found(format!("no habit named '{}'", name)));
                }
                let is_device: Option<bool> = match field {
                    "is_device" => Some(parsed(request, "value")?),
                    "name" => None,
                    other => return Err(bad_request(format!("unknown field '{}'", other))),
                };
                for habit in state.habits.iter_mut().filter(|h| h.name == name) {
                    match is_device {
                        Some(flag) => habit.is_device = flag,
                        None => habit.name = value.to_string(),
                    }
                }
                Ok("{}".to_string())
            }
            (Method::Post, ["habits", "delete"]) => {
                let name = param(request, "name")?;
                state.habits.retain(|h| h.name != name);
                Ok("{}".to_string())
            }
            (Method::Get, ["events", "habit", id]) => {
                let habit_id: i64 = id.parse().map_err(|_| bad_request("bad habit id"))?;
                let events: Vec<RemoteEvent> = state
                    .events
                    .range((habit_id, NaiveDate::MIN)..=(habit_id, NaiveDate::MAX))
                    .map(|((habit_id, date), p)| RemoteEvent {
                        habit_id: *habit_id,
                        date: *date,
                        progress: p.progress,
                        note: p.note.clone(),
                    })
                    .collect();
                Ok(json!({ "events": events }).to_string())
            }
            (Method::Get, ["events", "habit", id, "map"]) => {
                let habit_id: i64 = id.parse().map_err(|_| bad_request("bad habit id"))?;
                let events: BTreeMap<NaiveDate, EventPayload> = state
                    .events
                    .range((habit_id, NaiveDate::MIN)..=(habit_id, NaiveDate::MAX))
                    .map(|((_, date), p)| (*date, p.clone()))
                    .collect();
                serde_json::to_string(&EventMapEnvelope { events })
                    .map_err(|e| (500, e.to_string()))
            }
            (Method::Post, ["events", "add"]) => {
                let event: RemoteEvent = body(request)?;
                state.events.insert(
                    (event.habit_id, event.date),
                    EventPayload {
                        progress: event.progress,
                        note: event.note,
                    },
                );
                Ok("{}".to_string())
            }
            (Method::Post, ["events", "habit", id, "batch"]) => {
                let habit_id: i64 = id.parse().map_err(|_| bad_request("bad habit id"))?;
                let batch: EventMapEnvelope = body(request)?;
                for (date, payload) in batch.events {
                    state.events.insert((habit_id, date), payload);
                }
                Ok("{}".to_string())
            }
            (Method::Post, ["events", "delete"]) => {
                let key: DeleteKey = body(request)?;
                state.events.remove(&(key.habit_id, key.date));
                Ok("{}".to_string())
            }
            (Method::Get, ["categories"]) => {
                Ok(json!({ "categories": state.categories }).to_string())
            }
            (Method::Post, ["categories", "add"]) => {
                let mut category: RemoteCategory = body(request)?;
                let id = state.allocate_id();
                category.id = Some(id);
                state.categories.push(category);
                Ok(json!({ "id": id }).to_string())
            }
            (Method::Post, ["categories", "update", id]) => {
                let id: i64 = id.parse().map_err(|_| bad_request("bad category id"))?;
                let update: RemoteCategory = body(request)?;
                let category = state
                    .categories
                    .iter_mut()
                    .find(|c| c.id == Some(id))
                    .ok_or_else(|| not_found(format!("no category {}", id)))?;
                category.name = update.name;
                category.habits = update.habits;
                Ok("{}".to_string())
            }
            (Method::Post, ["categories", "delete", id]) => {
                let id: i64 = id.parse().map_err(|_| bad_request("bad category id"))?;
                state.categories.retain(|c| c.id != Some(id));
                Ok("{}".to_string())
            }
            (Method::Get, ["rules"]) => Ok(json!({ "result": state.rules }).to_string()),
            (Method::Post, ["rules", "add"]) => {
                let rule = RemoteRule {
                    id: Some(state.allocate_id()),
                    habit: param(request, "habit")?.to_string(),
                    day: parsed(request, "day")?,
                    hour: parsed(request, "hour")?,
                    minute: parsed(request, "minute")?,
                    active: parsed(request, "active")?,
                };
                state.rules.push(rule);
                Ok("{}".to_string())
            }
            (Method::Post, ["rules", "update"]) => {
                let id: i64 = parsed(request, "id")?;
                let habit = param(request, "habit")?.to_string();
                let day = parsed(request, "day")?;
                let hour = parsed(request, "hour")?;
                let minute = parsed(request, "minute")?;
                let active = parsed(request, "active")?;
                let rule = state
                    .rules
                    .iter_mut()
                    .find(|r| r.id == Some(id))
                    .ok_or_else(|| not_found(format!("no rule {}", id)))?;
                rule.habit = habit;
                rule.day = day;
                rule.hour = hour;
                rule.minute = minute;
                rule.active = active;
                Ok("{}".to_string())
            }
            (Method::Post, ["rules", "delete"]) => {
                let habit = param(request, "habit")?.to_string();
                if request.query_param("day").is_some() {
                    let day: u8 = parsed(request, "day")?;
                    let hour: u8 = parsed(request, "hour")?;
                    let minute: u8 = parsed(request, "minute")?;
                    state.rules.retain(|r| {
                        !(r.habit == habit && r.day == day && r.hour == hour && r.minute == minute)
                    });
                } else {
                    state.rules.retain(|r| r.habit != habit);
                }
                Ok("{}".to_string())
            }
            (Method::Get, ["logs"]) => {
                let name = request.query_param("name").unwrap_or("");
                let logs: Vec<&RemoteLog> = state
                    .logs
                    .iter()
                    .filter(|l| name.is_empty() || l.name == name)
                    .collect();
                Ok(json!({ "result": logs }).to_string())
            }
            (Method::Post, ["logs", "add"]) => {
                let log = RemoteLog {
                    id: Some(state.allocate_id()),
                    name: param(request, "name")?.to_string(),
                    state: param(request, "state")?.to_string(),
                    reported: parsed(request, "reported")?,
                };
                state.logs.push(log);
                Ok("{}".to_string())
            }
            (Method::Post, ["logs", "update"]) => {
                let id: i64 = parsed(request, "id")?;
                let field = param(request, "field")?;
                let value = param(request, "value")?;
                let log = state
                    .logs
                    .iter_mut()
                    .find(|l| l.id == Some(id))
                    .ok_or_else(|| not_found(format!("no log {}", id)))?;
                match field {
                    "name" => log.name = value.to_string(),
                    "state" => log.state = value.to_string(),
                    "reported" => {
                        log.reported = value.parse().map_err(|_| bad_request("invalid boolean"))?
                    }
                    other => return Err(bad_request(format!("unknown field '{}'", other))),
                }
                Ok("{}".to_string())
            }
            (Method::Post, ["logs", "delete"]) => {
                let id: i64 = parsed(request, "id")?;
                state.logs.retain(|l| l.id != Some(id));
                Ok("{}".to_string())
            }
            _ => Err(not_found(format!("no route for {} {}", method, route))),
        }
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        let Some(route) = request.path.strip_prefix(&self.prefix) else {
            return Ok(HttpResponse {
                status: 404,
                body: format!("unknown user path {}", request.path),
            });
        };

        if let Some(index) = state
            .failures
            .iter()
            .position(|(method, suffix, _)| *method == request.method && suffix == route)
        {
            let (_, _, status) = state.failures.remove(index);
            return Ok(HttpResponse {
                status,
                body: "injected failure".to_string(),
            });
        }

        let response = match Self::handle(&mut state, request.method, route, &request) {
            Ok(body) => HttpResponse { status: 200, body },
            Err((status, body)) => HttpResponse { status, body },
        };
        Ok(response)
    }
}
