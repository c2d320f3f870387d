//! Job lifecycle model.
//!
//! A [`Job`] is created client-side the moment a submission succeeds and is
//! afterwards only mutated by applying [`JobSnapshot`]s produced by the poller.
//! Once its status is terminal the record is frozen.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::params::ParamBag;
use crate::model::tool::Tool;

/// Opaque identifier assigned by the backend on successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        JobId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        JobId::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        JobId(value)
    }
}

/// Remote status of a job as reported by `GET /jobs/{id}`.
///
/// Any value the backend sends that is not one of the known statuses decodes
/// to `Unknown`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Failed,
    Unknown,
}

impl JobStatus {
    /// A terminal status is one from which polling never resumes.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed | JobStatus::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }

    /// Combines the currently known status with a freshly reported one.
    ///
    /// Statuses only move toward a terminal value: a terminal status is kept
    /// forever, and a `queued` report after `running` was seen is ignored.
    pub fn advance(self, reported: JobStatus) -> JobStatus {
        if self.is_terminal() {
            return self;
        }
        match (self, reported) {
            (JobStatus::Running, JobStatus::Queued) => JobStatus::Running,
            _ => reported,
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "finished" => JobStatus::Finished,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        JobStatus::from(value.as_str())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact flavour offered by the download endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    Full,
    Lite,
}

impl DownloadMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadMode::Full => "full",
            DownloadMode::Lite => "lite",
        }
    }
}

/// Merged result of one polling cycle: the status and the log tail that were
/// fetched together, plus the last transient failure if one happened.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    /// Most recent log tail. Replaced wholesale every cycle.
    pub logs: String,
    pub last_error: Option<String>,
    /// Number of cycles merged into this snapshot so far.
    pub cycle: u64,
}

impl JobSnapshot {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            exit_code: None,
            logs: String::new(),
            last_error: None,
            cycle: 0,
        }
    }
}

/// One remote unit of work as tracked by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub tool: Tool,
    pub params: ParamBag,
}

impl Job {
    /// Record created the instant the backend accepted a submission.
    pub fn submitted(id: JobId, tool: Tool, params: ParamBag) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            exit_code: None,
            tool,
            params,
        }
    }

    /// Applies a polled snapshot. Snapshots for another id, or arriving after
    /// the job reached a terminal status, are ignored.
    ///
    /// Returns `true` when the record changed.
    pub fn apply(&mut self, snapshot: &JobSnapshot) -> bool {
        if snapshot.job_id != self.id || self.status.is_terminal() {
            return false;
        }
        let status = self.status.advance(snapshot.status);
        let exit_code = snapshot.exit_code.or(self.exit_code);
        let changed = status != self.status || exit_code != self.exit_code;
        self.status = status;
        self.exit_code = exit_code;
        changed
    }

    /// Results can only be retrieved for jobs that finished successfully.
    pub fn can_download(&self) -> bool {
        self.status == JobStatus::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, status: JobStatus) -> JobSnapshot {
        JobSnapshot {
            status,
            ..JobSnapshot::new(JobId::from(id))
        }
    }

    #[test]
    fn unrecognised_status_decodes_to_unknown() {
        let status: JobStatus = serde_json::from_str("\"exploded\"").unwrap();
        assert_eq!(status, JobStatus::Unknown);
        let status: JobStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(status, JobStatus::Running);
    }

    #[test]
    fn terminal_status_is_never_left() {
        assert_eq!(JobStatus::Failed.advance(JobStatus::Running), JobStatus::Failed);
        assert_eq!(JobStatus::Running.advance(JobStatus::Queued), JobStatus::Running);
        assert_eq!(JobStatus::Queued.advance(JobStatus::Finished), JobStatus::Finished);
    }

    #[test]
    fn job_ignores_foreign_and_late_snapshots() {
        let mut job = Job::submitted(JobId::from("a1"), Tool::AlphaFold, ParamBag::default());

        assert!(!job.apply(&snapshot("b2", JobStatus::Finished)));
        assert_eq!(job.status, JobStatus::Queued);

        let mut done = snapshot("a1", JobStatus::Finished);
        done.exit_code = Some(0);
        assert!(job.apply(&done));
        assert!(job.can_download());

        assert!(!job.apply(&snapshot("a1", JobStatus::Running)));
        assert_eq!(job.status, JobStatus::Finished);
        assert_eq!(job.exit_code, Some(0));
    }

    #[test]
    fn failed_and_unknown_block_download() {
        let mut job = Job::submitted(JobId::from("a1"), Tool::ProteinMpnn, ParamBag::default());
        job.apply(&snapshot("a1", JobStatus::Unknown));
        assert!(!job.can_download());
    }
}
