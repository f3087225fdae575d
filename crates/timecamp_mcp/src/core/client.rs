use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::{Map, Value, json};

use crate::core::{
    api::{ApiRequest, TimeCampApi},
    error::{TimeCampError, TimeCampResult},
    models::{EntryChanges, EntryUpdatePayload, Envelope, NewEntryPayload, RawTask, TaskSummary},
    utils::{self, DATE_FORMAT, SERVICE_TAG},
};

pub const DEFAULT_USER_IDS: &str = "me";
pub const DEFAULT_OPT_FIELDS: &str = "tags";

/// Entry fields the remote sends that callers never see
const DROPPED_ENTRY_FIELDS: &[&str] = &[
    "task_note",
    "locked",
    "addons_external_id",
    "color",
    "description",
    "hasEntryLocationHistory",
    "name",
    "duration",
];

/// TimeCamp API client bound to one credential
///
/// Tool-facing operations return an [`Envelope`]; only the id lookup used by
/// updates hands back a plain result.
#[derive(Clone)]
pub struct TimeCampClient {
    api: Arc<dyn TimeCampApi>,
    today: Option<NaiveDate>,
}

impl TimeCampClient {
    pub fn new(api: Arc<dyn TimeCampApi>) -> Self {
        Self { api, today: None }
    }

    /// Pin the date used for the default lookup window
    #[cfg(test)]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub async fn create_entry(
        &self,
        from: &str,
        to: &str,
        note: &str,
        task_id: Option<u64>,
    ) -> Envelope {
        self.try_create_entry(from, to, note, task_id).await.into()
    }

    pub async fn list_entries(&self, from: &str, to: &str) -> Envelope {
        self.list_entries_for(from, to, DEFAULT_USER_IDS, DEFAULT_OPT_FIELDS)
            .await
    }

    pub async fn list_entries_for(
        &self,
        from: &str,
        to: &str,
        user_ids: &str,
        fields: &str,
    ) -> Envelope {
        self.fetch_entries(from, to, user_ids, fields)
            .await
            .map(|entries| {
                let count = entries.len();
                let data = Value::Array(entries.into_iter().map(Value::Object).collect());
                Envelope::success(data, format!("Found {} time entries", count))
            })
            .into()
    }

    pub async fn list_tasks(&self) -> Envelope {
        self.fetch_tasks()
            .await
            .and_then(|tasks| {
                let count = tasks.len();
                Ok(Envelope::success(
                    serde_json::to_value(tasks)?,
                    format!("Found {} active tasks", count),
                ))
            })
            .into()
    }

    pub async fn update_entry(&self, entry_id: &str, changes: &EntryChanges) -> Envelope {
        self.try_update_entry(entry_id, changes).await.into()
    }

    pub async fn delete_entry(&self, entry_id: &str) -> Envelope {
        self.try_delete_entry(entry_id).await.into()
    }

    async fn try_create_entry(
        &self,
        from: &str,
        to: &str,
        note: &str,
        task_id: Option<u64>,
    ) -> TimeCampResult<Envelope> {
        let start_time = utils::normalize_datetime(from);
        let end_time = utils::normalize_datetime(to);
        let start = utils::parse_datetime(&start_time)?;
        let end = utils::parse_datetime(&end_time)?;

        let seconds = (end - start).num_seconds();
        if seconds <= 0 {
            return Err(TimeCampError::validation(format!(
                "End time ({}) must be after start time ({})",
                to, from
            )));
        }
        let minutes = seconds / 60;

        let payload = NewEntryPayload {
            date: start.date().format(DATE_FORMAT).to_string(),
            start_time,
            end_time,
            duration: seconds,
            note: note.to_string(),
            task_id,
            service: SERVICE_TAG,
        };
        tracing::info!(
            "Creating time entry on {} ({} minutes)",
            payload.date,
            minutes
        );

        let response = self
            .api
            .send(ApiRequest::post("/entries", serde_json::to_value(&payload)?))
            .await?;

        Ok(Envelope::success(
            response,
            format!(
                "Time entry created: {} to {} ({} minutes)",
                payload.start_time, payload.end_time, minutes
            ),
        )
        .with_duration(minutes))
    }

    async fn fetch_entries(
        &self,
        from: &str,
        to: &str,
        user_ids: &str,
        fields: &str,
    ) -> TimeCampResult<Vec<Map<String, Value>>> {
        let response = self
            .api
            .send(ApiRequest::get("/entries").query(&[
                ("from", from),
                ("to", to),
                ("user_ids", user_ids),
                ("opt_fields", fields),
            ]))
            .await?;

        let entries = match response {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(TimeCampError::UnexpectedResponse {
                    message: format!("expected a list of entries, got {}", other),
                });
            }
        };

        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::Object(map) => Some(normalize_entry(map)),
                _ => None,
            })
            .collect())
    }

    async fn fetch_tasks(&self) -> TimeCampResult<Vec<TaskSummary>> {
        let response = self
            .api
            .send(ApiRequest::get("/tasks").query(&[("ignoreAdminRights", "1")]))
            .await?;

        // Keyed by task id; an empty result comes back as `[]`
        let tasks: Vec<Value> = match response {
            Value::Object(by_id) => by_id.into_iter().map(|(_, task)| task).collect(),
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(TimeCampError::UnexpectedResponse {
                    message: format!("expected tasks keyed by id, got {}", other),
                });
            }
        };

        let mut active = Vec::with_capacity(tasks.len());
        for task in tasks {
            let task: RawTask = serde_json::from_value(task)?;
            if !task.is_archived() {
                active.push(TaskSummary::from(task));
            }
        }
        Ok(active)
    }

    /// Look an entry up by id on `date`, or in the trailing lookup window
    pub async fn get_entry_by_id(
        &self,
        entry_id: &str,
        date: Option<&str>,
    ) -> TimeCampResult<Map<String, Value>> {
        let wanted = parse_entry_id(entry_id)?;
        let (from, to) = utils::lookup_window(self.today(), date);

        self.fetch_entries(&from, &to, DEFAULT_USER_IDS, DEFAULT_OPT_FIELDS)
            .await?
            .into_iter()
            .find(|entry| entry.get("id").and_then(utils::as_numeric_id) == Some(wanted))
            .ok_or_else(|| TimeCampError::NotFound {
                entry_id: entry_id.trim().to_string(),
            })
    }

    async fn try_update_entry(
        &self,
        entry_id: &str,
        changes: &EntryChanges,
    ) -> TimeCampResult<Envelope> {
        let id = parse_entry_id(entry_id)?;
        for time in [&changes.from, &changes.to].into_iter().flatten() {
            utils::validate_clock_time(time)?;
        }
        if *changes == EntryChanges::default() {
            return Err(TimeCampError::validation(
                "Nothing to update: provide at least one of from, to, note or task_id",
            ));
        }

        let range = match (&changes.from, &changes.to) {
            (None, None) => None,
            (Some(from), Some(to)) => Some((from.clone(), to.clone())),
            (Some(from), None) => {
                let existing = self.get_entry_by_id(entry_id, None).await?;
                Some((from.clone(), existing_time(&existing, "end_time")?))
            }
            (None, Some(to)) => {
                let existing = self.get_entry_by_id(entry_id, None).await?;
                Some((existing_time(&existing, "start_time")?, to.clone()))
            }
        };

        let mut payload = EntryUpdatePayload {
            id,
            note: changes.note.clone(),
            task_id: changes.task_id,
            ..Default::default()
        };

        // Same-day arithmetic: a range crossing midnight is rejected as non-positive
        let mut time_change = None;
        if let Some((start, end)) = range {
            let start = utils::normalize_clock_time(&start);
            let end = utils::normalize_clock_time(&end);
            let seconds = (utils::minutes_of_day(&end)? - utils::minutes_of_day(&start)?) * 60;
            if seconds <= 0 {
                return Err(TimeCampError::validation(format!(
                    "End time ({}) must be after start time ({})",
                    end, start
                )));
            }

            time_change = Some((start.clone(), end.clone(), seconds / 60));
            payload.start_time = Some(start);
            payload.end_time = Some(end);
            payload.duration = Some(seconds);
        }

        let response = self
            .api
            .send(ApiRequest::put("/entries", serde_json::to_value(&payload)?))
            .await?;

        Ok(match time_change {
            Some((start, end, minutes)) => Envelope::success(
                response,
                format!(
                    "Time entry {} updated: time changed to {} - {} ({} minutes)",
                    id, start, end, minutes
                ),
            )
            .with_duration(minutes),
            None => Envelope::success(
                response,
                format!("Time entry {} updated (time unchanged)", id),
            ),
        })
    }

    async fn try_delete_entry(&self, entry_id: &str) -> TimeCampResult<Envelope> {
        let id = entry_id.trim();
        if id.is_empty() {
            return Err(TimeCampError::validation("entryId is required"));
        }

        let response = self
            .api
            .send(ApiRequest::delete_form(
                "/entries",
                &[("id", id), ("service", SERVICE_TAG)],
            ))
            .await?;

        Ok(Envelope::success(
            response,
            format!("Time entry {} deleted", id),
        ))
    }
}

fn parse_entry_id(entry_id: &str) -> TimeCampResult<i64> {
    entry_id.trim().parse().map_err(|_| {
        TimeCampError::validation(format!(
            "Invalid entry id '{}': expected a number",
            entry_id
        ))
    })
}

/// Clock part of an existing entry's start/end field
fn existing_time(entry: &Map<String, Value>, field: &str) -> TimeCampResult<String> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .and_then(|value| value.split_whitespace().last())
        .map(str::to_string)
        .ok_or_else(|| {
            TimeCampError::UnexpectedResponse {
                message: format!("existing entry has no {}", field),
            }
        })
}

/// Drop noisy fields and rename `name`/`description`, adding duration views
fn normalize_entry(entry: Map<String, Value>) -> Map<String, Value> {
    let mut normalized = Map::new();
    let mut name = None;
    let mut description = None;
    let mut duration = None;

    for (key, value) in entry {
        match key.as_str() {
            "name" => name = Some(value),
            "description" => description = Some(value),
            "duration" => duration = Some(value),
            field if DROPPED_ENTRY_FIELDS.contains(&field) => {}
            _ => {
                normalized.insert(key, value);
            }
        }
    }

    let seconds = utils::parse_seconds(duration.as_ref());
    normalized.insert("task_name".to_string(), or_empty(name));
    normalized.insert("duration_seconds".to_string(), json!(seconds));
    normalized.insert(
        "duration_hours".to_string(),
        json!(utils::seconds_to_hours(seconds)),
    );
    normalized.insert("note".to_string(), or_empty(description));
    normalized
}

fn or_empty(value: Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(value) => value,
    }
}
