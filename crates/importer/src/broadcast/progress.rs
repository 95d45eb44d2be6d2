//! Progress broadcaster for streaming applied job snapshots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::JobTicket;

/// A snapshot applied by the polling engine.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Job the snapshot belongs to.
    pub job_id: String,
    /// Sequence number of the fetch that produced it.
    pub seq: u64,
    /// The snapshot as received from the server.
    pub ticket: JobTicket,
    /// When the snapshot was applied.
    pub received_at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(job_id: &str, seq: u64, ticket: JobTicket) -> Self {
        Self {
            job_id: job_id.to_string(),
            seq,
            ticket,
            received_at: Utc::now(),
        }
    }
}

/// Broadcasts progress events to every observer.
#[derive(Clone)]
pub struct ProgressBroadcaster {
    sender: Arc<broadcast::Sender<ProgressEvent>>,
}

impl ProgressBroadcaster {
    /// `capacity` bounds how far a slow observer may lag before it skips events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: ProgressEvent) {
        // No observers is not an error.
        let _ = self.sender.send(event);
    }

    /// Receives events applied after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
