//! Cached list of known import jobs, for history and reattachment.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::engine::PollingEngine;
use crate::api::ImportBackend;
use crate::error::ApiError;
use crate::model::TaskSummary;

/// Client-side cache of the backend's scheduled tasks.
///
/// The server's order is kept as-is. Entries are unique by `job_id`.
pub struct TaskRegistry {
    backend: Arc<dyn ImportBackend>,
    tasks: RwLock<Vec<TaskSummary>>,
    refreshed_at: RwLock<Option<DateTime<Utc>>>,
}

impl TaskRegistry {
    pub fn new(backend: Arc<dyn ImportBackend>) -> Self {
        Self {
            backend,
            tasks: RwLock::new(Vec::new()),
            refreshed_at: RwLock::new(None),
        }
    }

    /// Re-fetches the task list and replaces the cache.
    ///
    /// On failure the previous cache is kept. Returns the number of tasks.
    pub async fn refresh(&self) -> Result<usize, ApiError> {
        let fetched = self.backend.scheduled_tasks().await?;
        let tasks = dedupe_by_job_id(fetched);
        let count = tasks.len();

        *write_lock(&self.tasks) = tasks;
        *write_lock(&self.refreshed_at) = Some(Utc::now());

        log::debug!("Task registry refreshed with {} tasks", count);
        Ok(count)
    }

    /// Cached tasks in server order.
    pub fn list(&self) -> Vec<TaskSummary> {
        read_lock(&self.tasks).clone()
    }

    pub fn get(&self, job_id: &str) -> Option<TaskSummary> {
        read_lock(&self.tasks)
            .iter()
            .find(|task| task.job_id == job_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        read_lock(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.tasks).is_empty()
    }

    /// When the cache was last replaced, if ever.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        *read_lock(&self.refreshed_at)
    }

    /// Reattaches the engine to a listed job without re-uploading it.
    ///
    /// Returns the selected entry, or `None` (and leaves the engine alone)
    /// when the job is not in the cache.
    pub fn select(&self, job_id: &str, engine: &PollingEngine) -> Option<TaskSummary> {
        let task = self.get(job_id)?;
        log::info!(
            "Reattaching to job {} ({}, {})",
            task.job_id,
            task.filename,
            task.status
        );
        engine.attach(&task.job_id);
        Some(task)
    }
}

/// Keeps one entry per job id, at the position of its first occurrence.
///
/// When the server lists a job twice, the entry with the newer `updated_at`
/// wins; on a tie the later entry wins.
fn dedupe_by_job_id(tasks: Vec<TaskSummary>) -> Vec<TaskSummary> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut result: Vec<TaskSummary> = Vec::with_capacity(tasks.len());

    for task in tasks {
        if task.job_id.trim().is_empty() {
            log::warn!("Ignoring scheduled task without a job id");
            continue;
        }

        match positions.get(&task.job_id) {
            Some(&index) => {
                if supersedes(&task, &result[index]) {
                    result[index] = task;
                }
            }
            None => {
                positions.insert(task.job_id.clone(), result.len());
                result.push(task);
            }
        }
    }

    result
}

fn supersedes(candidate: &TaskSummary, existing: &TaskSummary) -> bool {
    match (&candidate.updated_at, &existing.updated_at) {
        (Some(new), Some(old)) => new >= old,
        (None, Some(_)) => false,
        _ => true,
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Task registry lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Task registry lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
