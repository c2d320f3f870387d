use common::jobs::{DownloadMode, Job, JobSnapshot};
use common::model::tool::Tool;
use web_sys::File;

use crate::job_controller::JobError;

pub enum Msg {
    SelectTool(Tool),
    FileChosen(Option<File>),
    /// Raw form input for one option of the current tool.
    SetParam { name: &'static str, raw: String },
    Submit,
    Submitted(Result<Job, JobError>),
    Snapshot(JobSnapshot),
    Download { mode: DownloadMode, streamed: bool },
    Downloaded(Result<String, JobError>),
    CancelJob,
    CancelSent(Result<(), JobError>),
    ClearJob,
    HealthChecked(bool),
}
