//! Job tracking: submitting uploads, polling progress, browsing history and
//! retrying failed jobs.
//!
//! The [`PollingEngine`] owns the only live subscription. Every other
//! component that wants to follow a job goes through
//! [`PollingEngine::attach`], so at most one job is ever being polled.

pub mod engine;
pub mod registry;
pub mod retry;
pub mod submitter;

pub use engine::{EngineState, PollingEngine};
pub use registry::TaskRegistry;
pub use retry::RetryOrchestrator;
pub use submitter::{validate_csv_filename, CsvUpload, UploadSubmitter};
