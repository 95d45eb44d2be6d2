//! Wire data model shared by every component of the client.

pub mod numeric;
pub mod status;
pub mod ticket;

pub use status::JobStatus;
pub use ticket::{ErrorBody, JobTicket, TaskListResponse, TaskSummary, Timestamp, UploadResponse};
