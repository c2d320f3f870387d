//! Update function of the job console.
//!
//! Async work (submission, cancellation, streamed downloads) is spawned on
//! the browser executor and reports back through a message. Polling is not
//! driven from here: the poller publishes `Msg::Snapshot` on its own.

use common::jobs::JobSnapshot;
use log::{info, warn};
use web_sys::HtmlInputElement;
use yew::platform::spawn_local;
use yew::prelude::*;

use super::helpers::show_toast;
use super::messages::Msg;
use super::state::{Health, JobConsole};

pub fn update(console: &mut JobConsole, ctx: &Context<JobConsole>, msg: Msg) -> bool {
    match msg {
        Msg::SelectTool(tool) => {
            if console.tool == tool {
                return false;
            }
            console.tool = tool;
            // The chosen file was picked for the other tool's input type.
            console.file = None;
            if let Some(input) = console.file_input_ref.cast::<HtmlInputElement>() {
                input.set_value("");
            }
            if let Err(err) = console.store.save_tool(tool) {
                warn!("could not remember tool selection: {}", err);
            }
            true
        }
        Msg::FileChosen(file) => {
            console.file = file;
            true
        }
        Msg::SetParam { name, raw } => {
            let tool = console.tool;
            let Some(field) = tool.descriptor().field(name) else {
                return false;
            };
            let params = console
                .params
                .entry(tool)
                .or_insert_with(|| tool.descriptor().defaults());
            params.insert(name, field.parse_input(&raw));
            if let Err(err) = console.store.save(tool, params) {
                warn!("could not persist {} parameters: {}", tool.key(), err);
            }
            true
        }
        Msg::Submit => {
            if console.submitting {
                return false;
            }
            console.submitting = true;

            let client = console.client.clone();
            let tool = console.tool;
            let file = console.file.clone();
            let params = console.current_params();
            let link = ctx.link().clone();
            spawn_local(async move {
                let result = client.submit(tool, file.as_ref(), &params).await;
                link.send_message(Msg::Submitted(result));
            });
            true
        }
        Msg::Submitted(Ok(job)) => {
            console.submitting = false;
            show_toast(&format!("Job {} submitted.", job.id));

            if let Err(err) = console
                .poller
                .observe(job.id.clone(), ctx.link().callback(Msg::Snapshot))
            {
                warn!("could not start polling job {}: {}", job.id, err);
                show_toast("Status updates are unavailable for this job.");
            }
            console.snapshot = Some(JobSnapshot::new(job.id.clone()));
            console.job = Some(job);
            true
        }
        Msg::Submitted(Err(err)) => {
            console.submitting = false;
            warn!("submission failed: {}", err);
            show_toast(&err.to_string());
            true
        }
        Msg::Snapshot(snapshot) => {
            let Some(job) = console.job.as_mut() else {
                return false;
            };
            if snapshot.job_id != job.id {
                return false;
            }
            let was_terminal = job.status.is_terminal();
            job.apply(&snapshot);
            if !was_terminal && job.status.is_terminal() {
                show_toast(&format!("Job {} {}.", job.id, job.status.as_str()));
            }
            console.snapshot = Some(snapshot);
            true
        }
        Msg::Download { mode, streamed } => {
            if !console.can_download() {
                return false;
            }
            let Some(id) = console.job.as_ref().map(|job| job.id.clone()) else {
                return false;
            };

            if !streamed {
                if let Err(err) = console.downloader.download_direct(&id, mode) {
                    show_toast(&err.to_string());
                }
                return false;
            }

            console.downloading = true;
            let downloader = console.downloader.clone();
            let link = ctx.link().clone();
            spawn_local(async move {
                let result = downloader.download_streamed(&id, mode).await;
                link.send_message(Msg::Downloaded(result));
            });
            true
        }
        Msg::Downloaded(result) => {
            console.downloading = false;
            match result {
                Ok(filename) => show_toast(&format!("Saved {}.", filename)),
                Err(err) => {
                    warn!("{}", err);
                    show_toast(&err.to_string());
                }
            }
            true
        }
        Msg::CancelJob => {
            if !console.job_active() {
                return false;
            }
            let Some(id) = console.job.as_ref().map(|job| job.id.clone()) else {
                return false;
            };
            let client = console.client.clone();
            let link = ctx.link().clone();
            spawn_local(async move {
                let result = client.cancel(&id).await;
                link.send_message(Msg::CancelSent(result));
            });
            false
        }
        Msg::CancelSent(Ok(())) => {
            show_toast("Cancellation requested.");
            false
        }
        Msg::CancelSent(Err(err)) => {
            warn!("cancellation failed: {}", err);
            show_toast(&err.to_string());
            false
        }
        Msg::ClearJob => {
            console.poller.cancel();
            if let Some(job) = console.job.take() {
                info!("stopped showing job {}", job.id);
            }
            console.snapshot = None;
            true
        }
        Msg::HealthChecked(up) => {
            console.health = if up { Health::Up } else { Health::Down };
            true
        }
    }
}
