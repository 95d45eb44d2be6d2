//! Builders for test data and sessions.

#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::broadcast;

use importer::model::{JobStatus, JobTicket, TaskSummary, Timestamp};
use importer::{ClientConfig, ImportSession};

use super::backend::ScriptedBackend;

/// Builder for `JobTicket` snapshots.
pub struct TicketBuilder {
    ticket: JobTicket,
}

impl TicketBuilder {
    pub fn new(job_id: &str) -> Self {
        Self {
            ticket: JobTicket {
                job_id: job_id.to_string(),
                filename: "products.csv".to_string(),
                ..Default::default()
            },
        }
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.ticket.status = status;
        self
    }

    /// Sets `processed` and `total`, deriving `percent` the way the server does.
    pub fn progress(mut self, processed: u64, total: u64) -> Self {
        self.ticket.processed = processed;
        self.ticket.total = total;
        self.ticket.percent = if total == 0 {
            0.0
        } else {
            processed as f64 * 100.0 / total as f64
        };
        self
    }

    pub fn error(mut self, error: &str) -> Self {
        self.ticket.error = error.to_string();
        self
    }

    pub fn retries(mut self, retries: u64) -> Self {
        self.ticket.retries = retries;
        self
    }

    pub fn build(self) -> JobTicket {
        self.ticket
    }
}

pub fn processing(job_id: &str, processed: u64, total: u64) -> JobTicket {
    TicketBuilder::new(job_id)
        .status(JobStatus::Processing)
        .progress(processed, total)
        .build()
}

pub fn complete(job_id: &str, processed: u64, total: u64) -> JobTicket {
    TicketBuilder::new(job_id)
        .status(JobStatus::Complete)
        .progress(processed, total)
        .build()
}

pub fn failed(job_id: &str, error: &str) -> JobTicket {
    TicketBuilder::new(job_id)
        .status(JobStatus::Failed)
        .error(error)
        .build()
}

pub fn task(job_id: &str, status: JobStatus, updated_at: &str) -> TaskSummary {
    TaskSummary {
        job_id: job_id.to_string(),
        filename: format!("{}.csv", job_id),
        status,
        updated_at: Some(Timestamp::new(updated_at)),
        ..Default::default()
    }
}

pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub fn test_config() -> ClientConfig {
    ClientConfig {
        api_url: "http://import.test".to_string(),
        poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
        ..Default::default()
    }
}

pub fn session(backend: &ScriptedBackend) -> ImportSession {
    ImportSession::with_backend(test_config(), backend.as_backend())
}

/// Lets spawned tasks run without advancing the paused clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advances the paused clock by `duration`, then lets tasks run.
pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
    settle().await;
}

/// Everything currently buffered in a receiver.
pub fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}
