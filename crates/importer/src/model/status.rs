//! Job status vocabulary.

use serde::{Deserialize, Deserializer, Serialize};

/// Status of an import job as reported by the backend.
///
/// The canonical spelling of successful completion is `complete`. The backend
/// also emits `completed`, `queued` and `parsing`, which are accepted as
/// aliases. Anything else is treated as [`JobStatus::Processing`] so that an
/// unfamiliar intermediate state never stops polling.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Created,
    Uploading,
    Processing,
    Complete,
    Failed,
}

impl JobStatus {
    /// Parses a wire status, falling back to `Processing` for unknown values.
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "created" | "queued" => JobStatus::Created,
            "uploading" => JobStatus::Uploading,
            "processing" | "parsing" => JobStatus::Processing,
            "complete" | "completed" => JobStatus::Complete,
            "failed" => JobStatus::Failed,
            other => {
                log::warn!(
                    "Unknown job status '{}', treating it as processing",
                    other
                );
                JobStatus::Processing
            }
        }
    }

    /// Canonical wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Uploading => "uploading",
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    /// Returns true for `complete` and `failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Created => write!(f, "Created"),
            JobStatus::Uploading => write!(f, "Uploading"),
            JobStatus::Processing => write!(f, "Processing"),
            JobStatus::Complete => write!(f, "Complete"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(JobStatus::from_wire).unwrap_or_default())
    }
}
