//! Transport seam between the tracking components and the job backend.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{JobTicket, TaskSummary};

/// Operations the client needs from the import backend.
///
/// [`HttpBackend`](super::HttpBackend) talks to the real service; tests
/// substitute scripted implementations.
#[async_trait]
pub trait ImportBackend: Send + Sync {
    /// `POST /upload`: submits a CSV and returns the new job id.
    async fn upload(&self, filename: &str, contents: Vec<u8>) -> Result<String, ApiError>;

    /// `GET /progress?job_id=ID`: current snapshot of a job.
    async fn progress(&self, job_id: &str) -> Result<JobTicket, ApiError>;

    /// `GET /scheduled-tasks`: every job the server knows, in server order.
    async fn scheduled_tasks(&self) -> Result<Vec<TaskSummary>, ApiError>;

    /// `POST /retry/{job_id}`: asks the server to re-queue a failed job.
    async fn retry(&self, job_id: &str) -> Result<(), ApiError>;
}
