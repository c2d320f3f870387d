//! Job lifecycle controller.
//!
//! - [`client`]: stateless request primitives (submit, status, log tail,
//!   result address, cancel, health, artifact fetch).
//! - [`poller`]: the cancellable fetch-and-reconcile loop for one job.
//! - [`downloader`]: direct and streamed retrieval of a finished job's artifact.
//! - [`store`]: persisted form defaults.
//! - [`timer`]: the sleep source and the request deadline built on it.
//! - [`error`]: the shared failure taxonomy.
//!
//! Browser side effects sit behind small traits (`JobApi`, `Timer`,
//! `SaveTarget`, `StorageBackend`) so the loop and the download bookkeeping run
//! on the host in tests.

pub mod client;
pub mod downloader;
pub mod error;
pub mod poller;
pub mod store;
pub mod timer;

pub use client::JobClient;
pub use downloader::{BrowserSaveTarget, ResultDownloader};
pub use error::JobError;
pub use poller::{BrowserSpawner, JobPoller, PollSettings, PollerState};
pub use store::ParameterStore;
pub use timer::BrowserTimer;

/// Poller wired to the real API, `setTimeout` and the browser executor.
pub type BrowserPoller = JobPoller<JobClient, BrowserTimer, BrowserSpawner>;

pub type BrowserDownloader = ResultDownloader<JobClient, BrowserSaveTarget>;
