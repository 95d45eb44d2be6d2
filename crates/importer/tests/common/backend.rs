//! An in-memory `ImportBackend` driven by per-job scripts.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use importer::error::ApiError;
use importer::model::{JobStatus, JobTicket, TaskSummary};
use importer::ImportBackend;

/// One scripted answer to `GET /progress`.
#[derive(Debug, Clone)]
pub enum ProgressStep {
    Respond(JobTicket),
    /// Answer after the given delay (paused-clock time).
    Delayed(Duration, JobTicket),
    Fail(String),
    /// Never answer.
    Hang,
}

#[derive(Debug, Clone)]
pub enum UploadOutcome {
    Accept(String),
    Reject { status: u16, message: String },
}

#[derive(Debug, Clone)]
pub enum RetryOutcome {
    /// Re-queue the job: the listed task gets `retries + 1` and `processing`.
    Accept,
    Reject { status: u16, message: String },
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, VecDeque<ProgressStep>>,
    progress_calls: Vec<String>,
    uploads: VecDeque<UploadOutcome>,
    uploaded_files: Vec<String>,
    retry_outcome: Option<RetryOutcome>,
    retry_calls: Vec<String>,
    tasks: Vec<TaskSummary>,
    task_list_calls: usize,
}

/// Scripted backend.
///
/// Progress scripts are consumed one step per call; the last step of a script
/// repeats forever. Jobs without a script answer with an empty record, like
/// the real backend does for unknown ids.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<State>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the progress script of `job_id`.
    pub fn script(&self, job_id: &str, steps: Vec<ProgressStep>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(job_id.to_string(), steps.into());
        self
    }

    /// Queues the outcome of the next upload.
    pub fn on_upload(&self, outcome: UploadOutcome) -> &Self {
        self.state.lock().unwrap().uploads.push_back(outcome);
        self
    }

    pub fn on_retry(&self, outcome: RetryOutcome) -> &Self {
        self.state.lock().unwrap().retry_outcome = Some(outcome);
        self
    }

    pub fn set_tasks(&self, tasks: Vec<TaskSummary>) -> &Self {
        self.state.lock().unwrap().tasks = tasks;
        self
    }

    pub fn progress_calls(&self, job_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .progress_calls
            .iter()
            .filter(|id| id.as_str() == job_id)
            .count()
    }

    pub fn total_progress_calls(&self) -> usize {
        self.state.lock().unwrap().progress_calls.len()
    }

    pub fn upload_calls(&self) -> usize {
        self.state.lock().unwrap().uploaded_files.len()
    }

    pub fn uploaded_files(&self) -> Vec<String> {
        self.state.lock().unwrap().uploaded_files.clone()
    }

    pub fn retry_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().retry_calls.clone()
    }

    pub fn task_list_calls(&self) -> usize {
        self.state.lock().unwrap().task_list_calls
    }

    pub fn as_backend(&self) -> Arc<dyn ImportBackend> {
        Arc::new(self.clone())
    }

    fn next_step(&self, job_id: &str) -> Option<ProgressStep> {
        let mut state = self.state.lock().unwrap();
        state.progress_calls.push(job_id.to_string());
        let script = state.scripts.get_mut(job_id)?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

fn transport(endpoint: &str, message: &str) -> ApiError {
    ApiError::Transport {
        endpoint: endpoint.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl ImportBackend for ScriptedBackend {
    async fn upload(&self, filename: &str, _contents: Vec<u8>) -> Result<String, ApiError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.uploaded_files.push(filename.to_string());
            state.uploads.pop_front()
        };

        match outcome {
            Some(UploadOutcome::Accept(job_id)) => {
                let mut state = self.state.lock().unwrap();
                state.tasks.insert(
                    0,
                    TaskSummary {
                        job_id: job_id.clone(),
                        filename: filename.to_string(),
                        status: JobStatus::Created,
                        ..Default::default()
                    },
                );
                Ok(job_id)
            }
            Some(UploadOutcome::Reject { status, message }) => Err(ApiError::Status {
                endpoint: "/upload".to_string(),
                status,
                message,
            }),
            None => Err(transport("/upload", "no upload scripted")),
        }
    }

    async fn progress(&self, job_id: &str) -> Result<JobTicket, ApiError> {
        match self.next_step(job_id) {
            None => Ok(JobTicket::default()),
            Some(ProgressStep::Respond(ticket)) => Ok(ticket),
            Some(ProgressStep::Delayed(delay, ticket)) => {
                tokio::time::sleep(delay).await;
                Ok(ticket)
            }
            Some(ProgressStep::Fail(message)) => Err(transport("/progress", &message)),
            Some(ProgressStep::Hang) => std::future::pending().await,
        }
    }

    async fn scheduled_tasks(&self) -> Result<Vec<TaskSummary>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.task_list_calls += 1;
        Ok(state.tasks.clone())
    }

    async fn retry(&self, job_id: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.retry_calls.push(job_id.to_string());

        match state.retry_outcome.clone() {
            Some(RetryOutcome::Accept) => {
                if let Some(task) = state.tasks.iter_mut().find(|t| t.job_id == job_id) {
                    task.retries += 1;
                    task.status = JobStatus::Processing;
                    task.error.clear();
                }
                Ok(())
            }
            Some(RetryOutcome::Reject { status, message }) => Err(ApiError::Status {
                endpoint: format!("/retry/{}", job_id),
                status,
                message,
            }),
            None => Err(transport("/retry", "no retry scripted")),
        }
    }
}
