//! Polling engine: the single live subscription to a job's progress.
//!
//! Lifecycle of a subscription:
//!
//! ```text
//! IDLE --attach(id)--> POLLING --terminal status--> IDLE
//! POLLING --attach(other)--> POLLING   (previous subscription cancelled first)
//! POLLING --detach()--> IDLE
//! ```
//!
//! Each subscription is one Tokio task driven by a fixed-period interval.
//! Every tick (including the immediate first one) starts a fetch tagged with
//! a sequence number; fetches run concurrently with the timer, so a hung
//! request never delays the next tick. A response is applied only if its
//! sequence number is newer than the last applied one.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::ImportBackend;
use crate::broadcast::{Notification, NotificationBroadcaster, ProgressBroadcaster, ProgressEvent};
use crate::error::PollError;
use crate::model::{JobStatus, JobTicket};

/// Observable state of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Polling { job_id: String },
}

/// A live binding of one job id to one timer task.
struct Subscription {
    job_id: String,
    generation: u64,
    handle: JoinHandle<()>,
}

impl Subscription {
    fn cancel(self) {
        self.handle.abort();
    }
}

#[derive(Default)]
struct Slot {
    /// Bumped on every attach; a task only acts while its generation is current.
    generation: u64,
    current: Option<Subscription>,
    latest: Option<JobTicket>,
}

impl Slot {
    fn is_current(&self, generation: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|sub| sub.generation == generation)
    }
}

fn lock_slot(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Polling engine lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Owns at most one progress subscription at a time.
pub struct PollingEngine {
    backend: Arc<dyn ImportBackend>,
    interval: Duration,
    progress: ProgressBroadcaster,
    notifications: NotificationBroadcaster,
    slot: Arc<Mutex<Slot>>,
}

impl PollingEngine {
    pub fn new(
        backend: Arc<dyn ImportBackend>,
        interval: Duration,
        progress: ProgressBroadcaster,
        notifications: NotificationBroadcaster,
    ) -> Self {
        Self {
            backend,
            interval,
            progress,
            notifications,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Subscribes to `job_id`, replacing any existing subscription.
    ///
    /// The previous subscription is cancelled before anything else happens,
    /// even when it targets the same job: attaching always restarts the
    /// timer and performs a fresh immediate fetch.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach(&self, job_id: &str) {
        let mut slot = lock_slot(&self.slot);

        if let Some(previous) = slot.current.take() {
            debug!(
                "Cancelling subscription to job {} (generation {})",
                previous.job_id, previous.generation
            );
            previous.cancel();
        }

        slot.generation += 1;
        slot.latest = None;
        let generation = slot.generation;

        let poller = Poller {
            job_id: job_id.to_string(),
            generation,
            backend: Arc::clone(&self.backend),
            interval: self.interval,
            progress: self.progress.clone(),
            notifications: self.notifications.clone(),
            slot: Arc::clone(&self.slot),
        };
        let handle = tokio::spawn(poller.run());

        slot.current = Some(Subscription {
            job_id: job_id.to_string(),
            generation,
            handle,
        });

        info!(
            "Polling job {} every {:?} (generation {})",
            job_id, self.interval, generation
        );
    }

    /// Cancels the current subscription. Does nothing when idle.
    pub fn detach(&self) {
        let mut slot = lock_slot(&self.slot);
        if let Some(subscription) = slot.current.take() {
            info!("Stopped polling job {}", subscription.job_id);
            subscription.cancel();
        }
    }

    pub fn state(&self) -> EngineState {
        let slot = lock_slot(&self.slot);
        match &slot.current {
            Some(sub) if !sub.handle.is_finished() => EngineState::Polling {
                job_id: sub.job_id.clone(),
            },
            _ => EngineState::Idle,
        }
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.state(), EngineState::Polling { .. })
    }

    /// Job id of the live subscription, if any.
    pub fn current_job(&self) -> Option<String> {
        match self.state() {
            EngineState::Polling { job_id } => Some(job_id),
            EngineState::Idle => None,
        }
    }

    /// Most recently applied snapshot since the last attach.
    pub fn latest(&self) -> Option<JobTicket> {
        lock_slot(&self.slot).latest.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for PollingEngine {
    fn drop(&mut self) {
        self.detach();
    }
}

/// The body of one subscription task.
struct Poller {
    job_id: String,
    generation: u64,
    backend: Arc<dyn ImportBackend>,
    interval: Duration,
    progress: ProgressBroadcaster,
    notifications: NotificationBroadcaster,
    slot: Arc<Mutex<Slot>>,
}

impl Poller {
    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight = FuturesUnordered::new();
        let mut next_seq: u64 = 0;
        let mut last_applied: Option<u64> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let seq = next_seq;
                    next_seq += 1;
                    let backend = Arc::clone(&self.backend);
                    let job_id = self.job_id.clone();
                    in_flight.push(async move {
                        let result = backend.progress(&job_id).await;
                        (seq, result)
                    });
                }
                Some((seq, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    let ticket = match result {
                        Ok(ticket) => ticket,
                        Err(source) => {
                            let err = PollError { job_id: self.job_id.clone(), source };
                            warn!("{} (tick {}), will retry on next tick", err, seq);
                            continue;
                        }
                    };

                    if last_applied.is_some_and(|last| seq <= last) {
                        debug!(
                            "Discarding stale snapshot #{} for job {} (already applied #{:?})",
                            seq, self.job_id, last_applied
                        );
                        continue;
                    }
                    last_applied = Some(seq);

                    if !self.apply(seq, ticket) {
                        break;
                    }
                }
            }
        }
    }

    /// Publishes a snapshot. Returns false once the subscription is over.
    fn apply(&self, seq: u64, mut ticket: JobTicket) -> bool {
        let mut slot = lock_slot(&self.slot);
        if !slot.is_current(self.generation) {
            return false;
        }

        if ticket.job_id.is_empty() {
            ticket.job_id = self.job_id.clone();
        }

        slot.latest = Some(ticket.clone());
        let terminal = ticket.is_terminal();
        if terminal {
            slot.current = None;
        }

        self.progress
            .send(ProgressEvent::new(&self.job_id, seq, ticket.clone()));

        match ticket.status {
            JobStatus::Complete => {
                info!(
                    "Job {} complete: {} of {} records processed",
                    self.job_id, ticket.processed, ticket.total
                );
                self.notifications
                    .send(Notification::import_complete(&self.job_id, ticket.processed));
            }
            JobStatus::Failed => {
                let message = ticket
                    .failure_message()
                    .unwrap_or(crate::error::GENERIC_FAILURE_MESSAGE);
                warn!("Job {} failed: {}", self.job_id, message);
                self.notifications
                    .send(Notification::import_failed(&self.job_id, message));
            }
            _ => {}
        }

        !terminal
    }
}
