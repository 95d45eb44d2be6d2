//! The import view's lifecycle in one object.
//!
//! An [`ImportSession`] wires the backend, broadcasters, polling engine, task
//! registry, upload submitter and retry orchestrator together. It is the
//! owner of the polling subscription: tearing down (or dropping) the session
//! stops polling.

use std::path::Path;
use std::sync::Arc;

use log::info;
use tokio::sync::broadcast;

use crate::api::{HttpBackend, ImportBackend};
use crate::broadcast::{Notification, NotificationBroadcaster, ProgressBroadcaster, ProgressEvent};
use crate::config::ClientConfig;
use crate::error::{ImporterError, Result};
use crate::model::{JobTicket, TaskSummary};
use crate::tracking::{
    CsvUpload, EngineState, PollingEngine, RetryOrchestrator, TaskRegistry, UploadSubmitter,
};

pub struct ImportSession {
    config: ClientConfig,
    progress: ProgressBroadcaster,
    notifications: NotificationBroadcaster,
    engine: Arc<PollingEngine>,
    registry: Arc<TaskRegistry>,
    submitter: UploadSubmitter,
    retry: RetryOrchestrator,
}

impl ImportSession {
    /// Creates a session talking to the configured API over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let backend = HttpBackend::new(&config)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Creates a session on top of any backend.
    pub fn with_backend(config: ClientConfig, backend: Arc<dyn ImportBackend>) -> Self {
        let progress = ProgressBroadcaster::new(config.event_capacity);
        let notifications = NotificationBroadcaster::new(config.event_capacity);

        let engine = Arc::new(PollingEngine::new(
            Arc::clone(&backend),
            config.poll_interval(),
            progress.clone(),
            notifications.clone(),
        ));
        let registry = Arc::new(TaskRegistry::new(Arc::clone(&backend)));
        let submitter = UploadSubmitter::new(
            Arc::clone(&backend),
            Arc::clone(&registry),
            notifications.clone(),
        );
        let retry = RetryOrchestrator::new(
            backend,
            Arc::clone(&registry),
            Arc::clone(&engine),
            notifications.clone(),
        );

        Self {
            config,
            progress,
            notifications,
            engine,
            registry,
            submitter,
            retry,
        }
    }

    /// Initial load of the task list. Returns the number of known tasks.
    pub async fn mount(&self) -> Result<usize> {
        let count = self.registry.refresh().await?;
        info!("Import session mounted with {} known tasks", count);
        Ok(count)
    }

    /// Submits an upload and starts polling the new job.
    ///
    /// On failure the current subscription, if any, keeps running.
    pub async fn submit(&self, upload: CsvUpload) -> Result<String> {
        let job_id = self.submitter.submit(upload).await?;
        self.engine.attach(&job_id);
        Ok(job_id)
    }

    /// Reads a CSV from disk, submits it and starts polling the new job.
    pub async fn submit_path(&self, path: impl AsRef<Path>) -> Result<String> {
        let job_id = self.submitter.submit_path(path).await?;
        self.engine.attach(&job_id);
        Ok(job_id)
    }

    /// Resumes polling a job listed in the task registry.
    pub fn reattach(&self, job_id: &str) -> Result<TaskSummary> {
        self.registry
            .select(job_id, &self.engine)
            .ok_or_else(|| ImporterError::UnknownJob {
                job_id: job_id.to_string(),
            })
    }

    /// Polls `job_id` whether or not it is in the task list.
    pub fn attach(&self, job_id: &str) {
        self.engine.attach(job_id);
    }

    /// Re-queues a job and resumes polling it.
    pub async fn retry(&self, job_id: &str) -> Result<()> {
        self.retry.retry(job_id).await?;
        Ok(())
    }

    pub fn detach(&self) {
        self.engine.detach();
    }

    /// Stops polling. Safe to call more than once.
    pub fn teardown(&self) {
        self.engine.detach();
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn current_job(&self) -> Option<String> {
        self.engine.current_job()
    }

    pub fn latest(&self) -> Option<JobTicket> {
        self.engine.latest()
    }

    pub fn tasks(&self) -> Vec<TaskSummary> {
        self.registry.list()
    }

    /// Re-fetches the task list on demand.
    pub async fn refresh_tasks(&self) -> Result<usize> {
        Ok(self.registry.refresh().await?)
    }

    pub fn engine(&self) -> &PollingEngine {
        &self.engine
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }
}

impl Drop for ImportSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
