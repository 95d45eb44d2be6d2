pub mod api;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod tracking;

pub use api::{HttpBackend, ImportBackend};
pub use broadcast::{
    Notification, NotificationBroadcaster, NotificationKind, ProgressBroadcaster, ProgressEvent,
};
pub use config::{load_config, load_config_from_str, ClientConfig};
pub use error::{
    ApiError, ConfigError, ImporterError, PollError, Result, RetryError, UploadError,
    ValidationError,
};
pub use model::{JobStatus, JobTicket, TaskSummary, Timestamp};
pub use session::ImportSession;
pub use tracking::{
    validate_csv_filename, CsvUpload, EngineState, PollingEngine, RetryOrchestrator, TaskRegistry,
    UploadSubmitter,
};
