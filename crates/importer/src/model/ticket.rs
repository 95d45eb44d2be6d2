//! Job tickets and task summaries as exchanged with the import backend.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};

use super::numeric::{lenient_percent, lenient_string, lenient_u64};
use super::status::JobStatus;

/// A server-assigned timestamp.
///
/// The client never interprets timestamps beyond ordering them: numeric
/// values (epoch seconds, as the backend writes them) compare numerically,
/// anything else compares as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_value = match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_value.then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient_string(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Timestamp(trimmed.to_string())))
    }
}

/// Observable state of one import job.
///
/// Every field is optional on the wire: the progress endpoint answers with
/// an empty object for ids it has not initialized yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobTicket {
    /// Opaque job identifier.
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_id: String,
    #[serde(default)]
    pub status: JobStatus,
    /// Display name of the uploaded file.
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub processed: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total: u64,
    /// Server-computed progress, used as-is for display except that values
    /// outside `0..=100` are clamped into range.
    #[serde(default, deserialize_with = "lenient_percent")]
    pub percent: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_message: String,
    /// Empty unless the job failed.
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: String,
    #[serde(default, deserialize_with = "optional_timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "optional_timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub retries: u64,
}

impl JobTicket {
    /// Returns true if this snapshot ends the current retry generation.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The failure message to show, if the job failed.
    pub fn failure_message(&self) -> Option<&str> {
        if self.status != JobStatus::Failed {
            return None;
        }
        let trimmed = self.error.trim();
        Some(if trimmed.is_empty() {
            crate::error::GENERIC_FAILURE_MESSAGE
        } else {
            trimmed
        })
    }
}

/// A reduced ticket, as listed by the scheduled-tasks endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireTaskSummary")]
pub struct TaskSummary {
    pub job_id: String,
    pub filename: String,
    pub status: JobStatus,
    pub processed: u64,
    pub total: u64,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    pub retries: u64,
}

/// A task-list row as sent. Older rows carry `id` instead of `job_id`, and
/// some carry both.
#[derive(Deserialize)]
struct WireTaskSummary {
    #[serde(default, deserialize_with = "lenient_string")]
    job_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    filename: String,
    #[serde(default)]
    status: JobStatus,
    #[serde(default, deserialize_with = "lenient_u64")]
    processed: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    total: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    error: String,
    #[serde(default, deserialize_with = "optional_timestamp")]
    created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    updated_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_u64")]
    retries: u64,
}

impl From<WireTaskSummary> for TaskSummary {
    fn from(wire: WireTaskSummary) -> Self {
        let job_id = if wire.job_id.trim().is_empty() {
            wire.id
        } else {
            wire.job_id
        };
        Self {
            job_id,
            filename: wire.filename,
            status: wire.status,
            processed: wire.processed,
            total: wire.total,
            error: wire.error,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            retries: wire.retries,
        }
    }
}

impl From<&JobTicket> for TaskSummary {
    fn from(ticket: &JobTicket) -> Self {
        Self {
            job_id: ticket.job_id.clone(),
            filename: ticket.filename.clone(),
            status: ticket.status,
            processed: ticket.processed,
            total: ticket.total,
            error: ticket.error.clone(),
            created_at: ticket.created_at.clone(),
            updated_at: ticket.updated_at.clone(),
            retries: ticket.retries,
        }
    }
}

/// Body of `GET /scheduled-tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListResponse {
    #[serde(default)]
    pub tasks: Vec<TaskSummary>,
}

/// Body of a successful `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_id: String,
}

/// Error body the backend sends with non-success responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: String,
}
