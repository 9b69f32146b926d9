//! Transport-only client primitives for the code runner service.
//!
//! This crate owns request building and response decoding for the health,
//! execution and file endpoints. It holds no session state: the bearer token
//! is passed in per call, and interpreting responses (output concatenation,
//! connection downgrades, listing staleness) belongs to the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod url;

pub use client::RunnerApiClient;
pub use config::RunnerApiConfig;
pub use error::RunnerApiError;
pub use payload::{FileRecord, RunOutput, RunRequest, RunResponse};
pub use reqwest::StatusCode;
pub use url::{endpoint_url, Endpoint, DEFAULT_RUNNER_BASE_URL};
