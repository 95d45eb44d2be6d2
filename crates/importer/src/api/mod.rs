//! Access to the import job backend.

pub mod backend;
pub mod http;

pub use backend::ImportBackend;
pub use http::HttpBackend;
