//! Re-queues failed jobs and resumes tracking them.

use std::sync::Arc;

use log::{info, warn};
use tracing::Instrument;

use super::engine::PollingEngine;
use super::registry::TaskRegistry;
use crate::api::ImportBackend;
use crate::broadcast::{Notification, NotificationBroadcaster};
use crate::error::RetryError;

pub struct RetryOrchestrator {
    backend: Arc<dyn ImportBackend>,
    registry: Arc<TaskRegistry>,
    engine: Arc<PollingEngine>,
    notifications: NotificationBroadcaster,
}

impl RetryOrchestrator {
    pub fn new(
        backend: Arc<dyn ImportBackend>,
        registry: Arc<TaskRegistry>,
        engine: Arc<PollingEngine>,
        notifications: NotificationBroadcaster,
    ) -> Self {
        Self {
            backend,
            registry,
            engine,
            notifications,
        }
    }

    /// Asks the backend to re-run `job_id`.
    ///
    /// On success the task list is refreshed and the engine is attached to
    /// the job, replacing whatever it was tracking. On failure the engine is
    /// left untouched.
    pub async fn retry(&self, job_id: &str) -> Result<(), RetryError> {
        let span = tracing::info_span!("importer.retry_job", job_id = %job_id);
        self.run(job_id).instrument(span).await
    }

    async fn run(&self, job_id: &str) -> Result<(), RetryError> {
        if let Err(err) = self.backend.retry(job_id).await {
            let err = RetryError::from_api(job_id, err);
            warn!("{}", err);
            self.notifications
                .send(Notification::retry_failed(job_id, &err.user_message()));
            return Err(err);
        }

        info!("Job {} queued for retry", job_id);
        self.notifications.send(Notification::retry_started(job_id));

        if let Err(e) = self.registry.refresh().await {
            warn!("Failed to refresh task list after retry: {}", e);
        }

        self.engine.attach(job_id);
        Ok(())
    }
}
