use std::path::PathBuf;
use thiserror::Error;

/// Message shown when the server reports a failure without any detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred";

#[derive(Error, Debug)]
pub enum ImporterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Retry error: {0}")]
    Retry(#[from] RetryError),

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Job {job_id} is not in the task list")]
    UnknownJob { job_id: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Bad local input, rejected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{filename}' is not a CSV file")]
    NotCsv { filename: String },

    #[error("No file name given")]
    MissingFilename,
}

/// Failures of a single request against the import backend.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl ApiError {
    /// The message a user should see for this failure.
    ///
    /// Non-success responses give the server-provided text, which is empty
    /// when the server sent none. Transport and decode failures give the
    /// formatted error.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.trim().to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload of '{filename}' failed: {source}")]
    Request {
        filename: String,
        #[source]
        source: ApiError,
    },
}

/// A single poll tick failed. Logged, never surfaced to the user.
#[derive(Error, Debug)]
#[error("Polling job {job_id} failed: {source}")]
pub struct PollError {
    pub job_id: String,
    #[source]
    pub source: ApiError,
}

#[derive(Error, Debug)]
pub enum RetryError {
    #[error("Retry of job {job_id} was rejected: {message}")]
    Rejected { job_id: String, message: String },

    #[error("Retry of job {job_id} failed: {source}")]
    Request {
        job_id: String,
        #[source]
        source: ApiError,
    },
}

impl RetryError {
    /// Builds the error for a backend failure, keeping server rejections
    /// distinguishable from transport problems.
    pub fn from_api(job_id: &str, err: ApiError) -> Self {
        match err {
            ApiError::Status { message, .. } => RetryError::Rejected {
                job_id: job_id.to_string(),
                message: if message.trim().is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    message
                },
            },
            source => RetryError::Request {
                job_id: job_id.to_string(),
                source,
            },
        }
    }

    /// The message a user should see for this failure.
    pub fn user_message(&self) -> String {
        match self {
            RetryError::Rejected { message, .. } => message.clone(),
            RetryError::Request { source, .. } => source.user_message(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImporterError>;
