//! Request primitives for the jobs API.
//!
//! `JobClient` is stateless apart from its configuration: every method maps to
//! exactly one HTTP request (or none, for `result_url`). Each request carries an
//! `AbortSignal` and is aborted when the configured timeout elapses before the
//! response has been received and decoded.

use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use common::jobs::{DownloadMode, Job, JobId, JobStatus};
use common::model::params::ParamBag;
use common::model::tool::Tool;
use common::requests::{submit_fields, ErrorDetail, LogsResponse, StatusResponse, SubmitResponse};
use futures_util::future::ready;
use gloo_net::http::{Request, Response};
use log::{debug, info};
use wasm_bindgen::JsValue;
use web_sys::{AbortController, AbortSignal, File, FormData};

use super::error::JobError;
use super::timer::{with_deadline, BrowserTimer, Timer};
use crate::config::ClientConfig;

/// Status half of a polling cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub status: JobStatus,
    pub exit_code: Option<i32>,
}

/// The two fetches the poller issues every cycle.
///
/// Kept behind a trait so the polling loop can run against scripted backends.
#[async_trait(?Send)]
pub trait JobApi {
    async fn fetch_status(&self, id: &JobId) -> Result<StatusReport, JobError>;

    /// Returns at most the last `tail` lines of the job log, as cut by the backend.
    async fn fetch_logs(&self, id: &JobId, tail: u32) -> Result<String, JobError>;
}

/// Artifact held in memory by the streamed download path.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

#[derive(Clone)]
pub struct JobClient<T = BrowserTimer> {
    config: Rc<ClientConfig>,
    timer: T,
}

impl JobClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_timer(config, BrowserTimer)
    }
}

impl<T: Timer> JobClient<T> {
    /// Client whose request deadlines are measured by `timer`.
    pub fn with_timer(config: ClientConfig, timer: T) -> Self {
        Self {
            config: Rc::new(config),
            timer,
        }
    }

    fn jobs_url(&self) -> String {
        format!("{}/jobs", self.config.api_base)
    }

    fn job_url(&self, id: &JobId) -> String {
        format!("{}/jobs/{}", self.config.api_base, id)
    }

    pub fn logs_url(&self, id: &JobId, tail: u32) -> String {
        format!("{}/logs?tail={}", self.job_url(id), tail)
    }

    /// Address the browser can navigate to in order to download the artifact.
    /// Pure: performs no I/O.
    pub fn result_url(&self, id: &JobId, mode: DownloadMode) -> String {
        format!("{}/download?mode={}", self.job_url(id), mode.as_str())
    }

    pub fn stream_url(&self, id: &JobId, mode: DownloadMode) -> String {
        format!("{}/download_stream?mode={}", self.job_url(id), mode.as_str())
    }

    fn cancel_url(&self, id: &JobId) -> String {
        format!("{}/cancel", self.job_url(id))
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.api_base)
    }

    /// Submits `file` and `params` for processing by `tool`.
    ///
    /// A missing file is rejected before anything is sent. On success the
    /// returned `Job` is `queued`, whatever the backend echoed.
    pub async fn submit(
        &self,
        tool: Tool,
        file: Option<&File>,
        params: &ParamBag,
    ) -> Result<Job, JobError> {
        let file = file.ok_or_else(|| {
            JobError::Validation("Please choose an input file first.".to_string())
        })?;
        let fields = submit_fields(tool, params, self.config.param_encoding)
            .map_err(|err| JobError::Validation(format!("parameters cannot be encoded: {}", err)))?;

        let form = FormData::new().map_err(js_error)?;
        for (name, value) in &fields {
            form.append_with_str(name, value).map_err(js_error)?;
        }
        form.append_with_blob_and_filename("file", file, &file.name())
            .map_err(js_error)?;

        let url = self.jobs_url();
        let accepted: SubmitResponse = self
            .exchange(
                move |signal| Request::post(&url).abort_signal(Some(signal)).body(form),
                |response| async move {
                    if !response.ok() {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        return Err(submission_rejected(status, &body));
                    }
                    Ok(response.json().await?)
                },
            )
            .await?;

        info!("submitted {} job {}", tool.key(), accepted.job_id);
        Ok(Job::submitted(accepted.job_id, tool, params.clone()))
    }

    /// Asks the backend to stop a job. The poller observes the resulting
    /// `failed` status on its next cycle.
    pub async fn cancel(&self, id: &JobId) -> Result<(), JobError> {
        let url = self.cancel_url(id);
        self.exchange(
            |signal| Request::post(&url).abort_signal(Some(signal)).build(),
            |response| async move {
                if response.ok() {
                    Ok(())
                } else {
                    Err(status_error(id, response.status()))
                }
            },
        )
        .await?;
        info!("cancellation requested for job {}", id);
        Ok(())
    }

    pub async fn health(&self) -> Result<(), JobError> {
        self.get(&self.health_url(), |response| async move {
            if response.ok() {
                Ok(())
            } else {
                Err(JobError::Transient(format!("health check returned {}", response.status())))
            }
        })
        .await
    }

    /// Fetches the whole artifact into memory. Every failure is a `Download` error.
    ///
    /// Only the wait for the response headers is bounded by the request
    /// timeout; the body of a large archive may take longer.
    pub async fn fetch_artifact(&self, id: &JobId, mode: DownloadMode) -> Result<Artifact, JobError> {
        let response = self
            .get(&self.stream_url(id, mode), |response| ready(Ok(response)))
            .await
            .map_err(|err| JobError::Download(err.to_string()))?;

        if !response.ok() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            return Err(JobError::Download(format!("HTTP {}: {}", status, detail)));
        }

        let headers = response.headers();
        let content_type = headers.get("content-type");
        let content_disposition = headers.get("content-disposition");
        let bytes = response
            .binary()
            .await
            .map_err(|err| JobError::Download(err.to_string()))?;

        debug!("fetched {} bytes of artifact for job {}", bytes.len(), id);
        Ok(Artifact {
            bytes,
            content_type,
            content_disposition,
        })
    }

    async fn get<D, Fut, R>(&self, url: &str, decode: D) -> Result<R, JobError>
    where
        D: FnOnce(Response) -> Fut,
        Fut: Future<Output = Result<R, JobError>>,
    {
        self.exchange(
            |signal| Request::get(url).abort_signal(Some(signal)).build(),
            decode,
        )
        .await
    }

    /// Sends the request built by `build` and hands the response to `decode`.
    ///
    /// Sending and decoding together are raced against the configured
    /// timeout; on expiry the request is aborted through its signal.
    async fn exchange<B, D, Fut, R>(&self, build: B, decode: D) -> Result<R, JobError>
    where
        B: FnOnce(&AbortSignal) -> Result<Request, gloo_net::Error>,
        D: FnOnce(Response) -> Fut,
        Fut: Future<Output = Result<R, JobError>>,
    {
        let controller = AbortController::new().map_err(js_error)?;
        let request = build(&controller.signal())?;
        let work = async move {
            let response = request.send().await?;
            decode(response).await
        };

        with_deadline(&self.timer, self.config.request_timeout(), work, || {
            controller.abort()
        })
        .await
    }
}

#[async_trait(?Send)]
impl<T: Timer> JobApi for JobClient<T> {
    async fn fetch_status(&self, id: &JobId) -> Result<StatusReport, JobError> {
        self.get(&self.job_url(id), |response| async move {
            if !response.ok() {
                return Err(status_error(id, response.status()));
            }
            let body: StatusResponse = response.json().await?;
            Ok(StatusReport {
                status: body.status,
                exit_code: body.exit_code,
            })
        })
        .await
    }

    async fn fetch_logs(&self, id: &JobId, tail: u32) -> Result<String, JobError> {
        self.get(&self.logs_url(id, tail), |response| async move {
            if !response.ok() {
                return Err(status_error(id, response.status()));
            }
            Ok(parse_logs(response.text().await?))
        })
        .await
    }
}

/// Maps a non-success status of a per-job request onto the taxonomy.
fn status_error(id: &JobId, status: u16) -> JobError {
    if status == 404 {
        JobError::NotFound(id.clone())
    } else {
        JobError::Transient(format!("HTTP {}", status))
    }
}

fn submission_rejected(status: u16, body: &str) -> JobError {
    JobError::Submission {
        status,
        detail: error_detail(body),
    }
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorDetail>(body)
        .map(|detail| detail.message())
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Log tails arrive either as raw text or as `{ "log": "..." }`.
fn parse_logs(body: String) -> String {
    match serde_json::from_str::<LogsResponse>(&body) {
        Ok(parsed) => parsed.log,
        Err(_) => body,
    }
}

fn js_error(err: JsValue) -> JobError {
    JobError::Transient(
        err.as_string()
            .unwrap_or_else(|| "browser API call failed".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn client() -> JobClient {
        JobClient::new(ClientConfig::default())
    }

    #[test]
    fn result_urls_differ_only_in_mode() {
        let client = client();
        let id = JobId::from("3fa9c2d1");

        let full = client.result_url(&id, DownloadMode::Full);
        let lite = client.result_url(&id, DownloadMode::Lite);

        assert_eq!(full, "/api/jobs/3fa9c2d1/download?mode=full");
        assert_eq!(lite, "/api/jobs/3fa9c2d1/download?mode=lite");
        assert_eq!(full.trim_end_matches("full"), lite.trim_end_matches("lite"));
    }

    #[test]
    fn log_tail_is_passed_through() {
        let client = client();
        let url = client.logs_url(&JobId::from("3fa9c2d1"), 400);
        assert_eq!(url, "/api/jobs/3fa9c2d1/logs?tail=400");
        assert!(client.logs_url(&JobId::from("x"), 7).ends_with("tail=7"));
    }

    #[test]
    fn submit_without_file_is_rejected_before_any_request() {
        let params = Tool::AlphaFold.descriptor().defaults();
        let result = block_on(client().submit(Tool::AlphaFold, None, &params));
        assert!(matches!(result, Err(JobError::Validation(_))));
    }

    #[test]
    fn rejection_carries_status_and_detail() {
        let err = submission_rejected(400, r#"{"detail":"ProteinMPNN expects a .pdb or .cif"}"#);
        assert_eq!(
            err,
            JobError::Submission {
                status: 400,
                detail: "ProteinMPNN expects a .pdb or .cif".to_string()
            }
        );

        let err = submission_rejected(502, "Bad Gateway\n");
        assert_eq!(
            err,
            JobError::Submission {
                status: 502,
                detail: "Bad Gateway".to_string()
            }
        );
    }

    #[test]
    fn not_found_is_distinguished_from_other_failures() {
        let id = JobId::from("gone");
        assert_eq!(status_error(&id, 404), JobError::NotFound(id.clone()));
        assert!(matches!(status_error(&id, 500), JobError::Transient(_)));
    }

    #[test]
    fn logs_accept_both_shapes() {
        assert_eq!(parse_logs(r#"{"log":"step 1\nstep 2"}"#.to_string()), "step 1\nstep 2");
        assert_eq!(parse_logs("I0101 running jackhmmer".to_string()), "I0101 running jackhmmer");
    }
}
