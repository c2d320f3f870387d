//! Failure taxonomy of the job controller.

use common::jobs::JobId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    /// Required input missing. Raised before any request is issued.
    #[error("{0}")]
    Validation(String),

    /// The backend rejected the job-creation request.
    #[error("submission rejected with status {status}: {detail}")]
    Submission { status: u16, detail: String },

    /// A request failed in a way that may succeed on retry: transport errors,
    /// timeouts, unexpected HTTP statuses, undecodable bodies.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The backend no longer recognises the job id.
    #[error("job {0} not found")]
    NotFound(JobId),

    /// Streamed retrieval or saving of an artifact failed.
    #[error("download failed: {0}")]
    Download(String),
}

impl From<gloo_net::Error> for JobError {
    fn from(err: gloo_net::Error) -> Self {
        JobError::Transient(err.to_string())
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::Transient(format!("invalid payload: {}", err))
    }
}
