//! Upload submitter: turns a local CSV into a server-side import job.

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use super::registry::TaskRegistry;
use crate::api::ImportBackend;
use crate::broadcast::{Notification, NotificationBroadcaster};
use crate::error::{ImporterError, UploadError, ValidationError};

/// Accepts only names ending in `.csv`, ignoring case.
pub fn validate_csv_filename(filename: &str) -> Result<(), ValidationError> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingFilename);
    }
    if !trimmed.to_ascii_lowercase().ends_with(".csv") {
        return Err(ValidationError::NotCsv {
            filename: trimmed.to_string(),
        });
    }
    Ok(())
}

/// A CSV file selected for upload.
#[derive(Debug, Clone)]
pub struct CsvUpload {
    filename: String,
    contents: Vec<u8>,
}

impl CsvUpload {
    pub fn new(filename: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            contents: contents.into(),
        }
    }

    /// Reads a file from disk.
    ///
    /// The file name is validated first, so a non-CSV path is rejected
    /// without touching the file system.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ImporterError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or(ValidationError::MissingFilename)?;

        validate_csv_filename(&filename)?;

        let contents = tokio::fs::read(path)
            .await
            .map_err(|source| UploadError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self { filename, contents })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Submits CSV files as import jobs.
pub struct UploadSubmitter {
    backend: Arc<dyn ImportBackend>,
    registry: Arc<TaskRegistry>,
    notifications: NotificationBroadcaster,
}

impl UploadSubmitter {
    pub fn new(
        backend: Arc<dyn ImportBackend>,
        registry: Arc<TaskRegistry>,
        notifications: NotificationBroadcaster,
    ) -> Self {
        Self {
            backend,
            registry,
            notifications,
        }
    }

    /// Uploads `upload` and returns the new job id.
    ///
    /// Validation failures never reach the network. Neither validation nor
    /// upload failures touch the polling engine; attaching to the new job is
    /// the caller's decision. A successful upload refreshes the task
    /// registry so the job shows up in history.
    pub async fn submit(&self, upload: CsvUpload) -> Result<String, ImporterError> {
        if let Err(err) = validate_csv_filename(&upload.filename) {
            warn!("Rejected upload: {}", err);
            self.notifications.send(Notification::invalid_file());
            return Err(err.into());
        }

        let CsvUpload { filename, contents } = upload;
        info!("Submitting {} ({} bytes)", filename, contents.len());

        let job_id = match self.backend.upload(&filename, contents).await {
            Ok(job_id) => job_id,
            Err(source) => {
                warn!("Upload of {} failed: {}", filename, source);
                self.notifications
                    .send(Notification::upload_failed(&source.user_message()));
                return Err(UploadError::Request { filename, source }.into());
            }
        };

        self.notifications.send(Notification::upload_started(&job_id));

        if let Err(e) = self.registry.refresh().await {
            warn!("Failed to refresh task list after upload: {}", e);
        }

        Ok(job_id)
    }

    /// Reads `path` and submits it.
    pub async fn submit_path(&self, path: impl AsRef<Path>) -> Result<String, ImporterError> {
        let upload = match CsvUpload::from_path(path).await {
            Ok(upload) => upload,
            Err(err) => {
                if matches!(err, ImporterError::Validation(_)) {
                    self.notifications.send(Notification::invalid_file());
                }
                return Err(err);
            }
        };
        self.submit(upload).await
    }
}
