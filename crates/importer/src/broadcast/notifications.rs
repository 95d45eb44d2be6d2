//! User-visible notifications (toasts).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: &str, message: &str, job_id: Option<&str>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.to_string(),
            job_id: job_id.map(|s| s.to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn invalid_file() -> Self {
        Self::new(
            NotificationKind::Error,
            "Invalid file",
            "Please select a CSV file",
            None,
        )
    }

    pub fn upload_started(job_id: &str) -> Self {
        Self::new(
            NotificationKind::Info,
            "Upload started",
            "Processing your file...",
            Some(job_id),
        )
    }

    pub fn upload_failed(reason: &str) -> Self {
        let message = if reason.trim().is_empty() {
            "Failed to upload file. Please try again.".to_string()
        } else {
            format!("Failed to upload file: {}", reason)
        };
        Self::new(NotificationKind::Error, "Upload failed", &message, None)
    }

    /// Terminal success of an import job.
    pub fn import_complete(job_id: &str, processed: u64) -> Self {
        Self::new(
            NotificationKind::Success,
            "Upload complete",
            &format!("Successfully processed {} products", processed),
            Some(job_id),
        )
    }

    /// Terminal failure reported by the server.
    pub fn import_failed(job_id: &str, error: &str) -> Self {
        Self::new(NotificationKind::Error, "Upload failed", error, Some(job_id))
    }

    pub fn retry_started(job_id: &str) -> Self {
        Self::new(
            NotificationKind::Info,
            "Retry started",
            &format!("Job {} was queued again", job_id),
            Some(job_id),
        )
    }

    pub fn retry_failed(job_id: &str, reason: &str) -> Self {
        Self::new(NotificationKind::Error, "Retry failed", reason, Some(job_id))
    }
}

/// Broadcasts notifications to every observer.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    sender: Arc<broadcast::Sender<Notification>>,
}

impl NotificationBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, notification: Notification) {
        log::debug!(
            "Notification [{:?}] {}: {}",
            notification.kind,
            notification.title,
            notification.message
        );
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_complete_reports_processed_count() {
        let n = Notification::import_complete("j1", 499_980);
        assert_eq!(n.kind, NotificationKind::Success);
        assert_eq!(n.message, "Successfully processed 499980 products");
        assert_eq!(n.job_id.as_deref(), Some("j1"));
    }

    #[test]
    fn test_upload_failed_without_reason() {
        let n = Notification::upload_failed("");
        assert_eq!(n.message, "Failed to upload file. Please try again.");
    }

    #[test]
    fn test_broadcaster_send_receive() {
        let broadcaster = NotificationBroadcaster::new(4);
        let mut rx = broadcaster.subscribe();

        broadcaster.send(Notification::invalid_file());

        let received = rx.try_recv().unwrap();
        assert_eq!(received.title, "Invalid file");
        assert_eq!(received.kind, NotificationKind::Error);
    }
}
