//! Runtime state of the job console.
//!
//! The console owns one controller stack: a shared [`JobClient`], the poller
//! for the job currently shown, the downloader and the parameter store. Form
//! values are kept per tool so switching back and forth does not lose edits.

use std::collections::BTreeMap;
use std::rc::Rc;

use common::jobs::{Job, JobSnapshot};
use common::model::params::ParamBag;
use common::model::tool::Tool;
use web_sys::File;
use yew::prelude::*;

use crate::config::ClientConfig;
use crate::job_controller::store::{browser_storage, StorageBackend};
use crate::job_controller::{
    BrowserDownloader, BrowserPoller, BrowserSaveTarget, BrowserSpawner, BrowserTimer, JobClient,
    JobPoller, ParameterStore, PollSettings, ResultDownloader,
};

/// Result of the startup `/health` check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Checking,
    Up,
    Down,
}

pub struct JobConsole {
    pub client: Rc<JobClient>,
    pub poller: BrowserPoller,
    pub downloader: Rc<BrowserDownloader>,
    pub store: ParameterStore<Box<dyn StorageBackend>>,

    pub tool: Tool,
    /// Form values for every tool, seeded from the store.
    pub params: BTreeMap<Tool, ParamBag>,
    pub file: Option<File>,
    pub file_input_ref: NodeRef,

    /// Job being shown. Replaced on every successful submission.
    pub job: Option<Job>,
    /// Latest snapshot published for `job`.
    pub snapshot: Option<JobSnapshot>,

    pub submitting: bool,
    pub downloading: bool,
    pub health: Health,
}

impl JobConsole {
    pub fn new(config: &ClientConfig) -> Self {
        let client = Rc::new(JobClient::new(config.clone()));
        let poller = JobPoller::new(
            client.clone(),
            BrowserTimer,
            BrowserSpawner,
            PollSettings::from(config),
        );
        let downloader = Rc::new(ResultDownloader::new(client.clone(), BrowserSaveTarget));

        let store = ParameterStore::open(browser_storage());
        let tool = store.load_tool();
        let params = Tool::ALL
            .into_iter()
            .map(|tool| (tool, store.load(tool)))
            .collect();

        Self {
            client,
            poller,
            downloader,
            store,
            tool,
            params,
            file: None,
            file_input_ref: NodeRef::default(),
            job: None,
            snapshot: None,
            submitting: false,
            downloading: false,
            health: Health::Checking,
        }
    }

    pub fn current_params(&self) -> ParamBag {
        self.params
            .get(&self.tool)
            .cloned()
            .unwrap_or_else(|| self.tool.descriptor().defaults())
    }

    pub fn can_download(&self) -> bool {
        !self.downloading && self.job.as_ref().is_some_and(Job::can_download)
    }

    /// A job is shown and has not reached a terminal status.
    pub fn job_active(&self) -> bool {
        self.job
            .as_ref()
            .is_some_and(|job| !job.status.is_terminal())
    }
}
