//! Shared test utilities for importer integration tests.
//!
//! This module provides:
//! - `ScriptedBackend`, an in-memory import backend replaying scripted responses
//! - Builders for tickets, task summaries and sessions

pub mod backend;
pub mod builders;

pub use backend::{ProgressStep, RetryOutcome, ScriptedBackend, UploadOutcome};
pub use builders::*;
