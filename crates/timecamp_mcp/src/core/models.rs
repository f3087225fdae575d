use derive_getters::Getters;
use rmcp::model::{CallToolResult, Content};
use rmcp::schemars;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::core::error::{TimeCampError, TimeCampResult};
use crate::core::utils;

pub trait Validate {
    fn validate(&self) -> TimeCampResult<()>;
}

/// Helper function to deserialize and trim strings
fn deserialize_trimmed_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.trim().to_string())
}

fn deserialize_trimmed_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()))
}

fn require(field: &str, value: &str) -> TimeCampResult<()> {
    if value.is_empty() {
        return Err(TimeCampError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Request to log a new time entry
#[derive(Debug, Deserialize, schemars::JsonSchema, Getters)]
pub struct AddTimeEntryRequest {
    /// Start of the entry as 'YYYY-MM-DD HH:MM' (e.g. '2025-06-21 09:00')
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    from: String,
    /// End of the entry as 'YYYY-MM-DD HH:MM' (e.g. '2025-06-21 09:43')
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    to: String,
    /// Description of the work done
    note: String,
    /// Optional TimeCamp task id to attach the entry to
    #[serde(default)]
    task_id: Option<u64>,
}

impl Validate for AddTimeEntryRequest {
    fn validate(&self) -> TimeCampResult<()> {
        require("from", &self.from)?;
        require("to", &self.to)
    }
}

/// Request to list time entries in a date range
#[derive(Debug, Deserialize, schemars::JsonSchema, Getters)]
pub struct GetTimeEntriesRequest {
    /// First day of the range as 'YYYY-MM-DD'
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    from: String,
    /// Last day of the range as 'YYYY-MM-DD'
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    to: String,
}

impl Validate for GetTimeEntriesRequest {
    fn validate(&self) -> TimeCampResult<()> {
        require("from", &self.from)?;
        require("to", &self.to)
    }
}

/// Request to delete a time entry
#[derive(Debug, Deserialize, schemars::JsonSchema, Getters)]
pub struct DeleteTimeEntryRequest {
    /// Id of the time entry to delete
    #[serde(rename = "entryId", deserialize_with = "deserialize_trimmed_string")]
    entry_id: String,
}

impl Validate for DeleteTimeEntryRequest {
    fn validate(&self) -> TimeCampResult<()> {
        require("entryId", &self.entry_id)
    }
}

/// Request to change an existing time entry; omitted fields are left unchanged
#[derive(Debug, Deserialize, schemars::JsonSchema, Getters)]
pub struct UpdateTimeEntryRequest {
    /// Id of the time entry to update
    #[serde(rename = "entryId", deserialize_with = "deserialize_trimmed_string")]
    entry_id: String,
    /// New start time as 'HH:MM'
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    from: Option<String>,
    /// New end time as 'HH:MM'
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    to: Option<String>,
    /// New description; an empty string clears it
    #[serde(default)]
    note: Option<String>,
    /// New TimeCamp task id
    #[serde(default)]
    task_id: Option<u64>,
}

impl Validate for UpdateTimeEntryRequest {
    fn validate(&self) -> TimeCampResult<()> {
        require("entryId", &self.entry_id)
    }
}

/// Changes to apply to an entry, as handed to the client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryChanges {
    pub from: Option<String>,
    pub to: Option<String>,
    pub note: Option<String>,
    pub task_id: Option<u64>,
}

impl From<&UpdateTimeEntryRequest> for EntryChanges {
    fn from(req: &UpdateTimeEntryRequest) -> Self {
        Self {
            from: req.from.clone(),
            to: req.to.clone(),
            note: req.note.clone(),
            task_id: req.task_id,
        }
    }
}

/// Body of `POST /entries`
#[derive(Debug, Clone, Serialize)]
pub struct NewEntryPayload {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: i64,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
    pub service: &'static str,
}

/// Body of `PUT /entries`; unset fields are never sent
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntryUpdatePayload {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
}

/// Task record as returned by `GET /tasks`
#[derive(Debug, Deserialize)]
pub struct RawTask {
    #[serde(default)]
    task_id: Value,
    #[serde(default)]
    parent_id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    level: Value,
    #[serde(default)]
    note: Value,
    #[serde(default)]
    archived: Value,
}

impl RawTask {
    pub fn is_archived(&self) -> bool {
        utils::is_flag_set(&self.archived)
    }
}

/// Projection of a task exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: Value,
    pub parent_id: Value,
    pub name: String,
    pub level: Value,
    pub note: Value,
}

impl From<RawTask> for TaskSummary {
    fn from(task: RawTask) -> Self {
        Self {
            task_id: task.task_id,
            parent_id: task.parent_id,
            name: task.name.unwrap_or_default(),
            level: task.level,
            note: task.note,
        }
    }
}

/// Uniform result of every client operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Duration in whole minutes, set when an operation computed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn success(data: Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            duration: None,
            error: None,
        }
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration = Some(minutes);
        self
    }

    pub fn failure(error: &TimeCampError) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            duration: None,
            error: Some(error.to_string()),
        }
    }

    /// Render as a single text block for a tool response
    pub fn render(self, failure_prefix: &str) -> CallToolResult {
        if self.success {
            let data = self.data.unwrap_or(Value::Null);
            let payload = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
            let text = format!("{}\n\n{}", self.message.unwrap_or_default(), payload);
            CallToolResult::success(vec![Content::text(text)])
        } else {
            let text = format!(
                "{}: {}",
                failure_prefix,
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
            CallToolResult::error(vec![Content::text(text)])
        }
    }
}

impl From<TimeCampResult<Envelope>> for Envelope {
    fn from(result: TimeCampResult<Envelope>) -> Self {
        result.unwrap_or_else(|e| {
            tracing::warn!("TimeCamp operation failed: {}", e);
            Envelope::failure(&e)
        })
    }
}
