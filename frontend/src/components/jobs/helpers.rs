//! Small utilities shared by the console's update and view code.

use common::jobs::{DownloadMode, JobStatus};
use common::model::tool::FieldKind;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

const TOAST_MS: u32 = 4000;

/// Shows a transient notification at the bottom of the page.
///
/// The element is appended to `<body>` and removed after a few seconds. Used
/// for submission results, terminal statuses and download failures.
pub fn show_toast(message: &str) {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    let (Ok(toast), Some(body)) = (document.create_element("div"), document.body()) else {
        return;
    };
    toast.set_text_content(Some(message));
    toast.set_class_name("toast");
    let toast: HtmlElement = toast.unchecked_into();
    let style = toast.style();
    style.set_property("position", "fixed").ok();
    style.set_property("bottom", "20px").ok();
    style.set_property("left", "50%").ok();
    style.set_property("transform", "translateX(-50%)").ok();
    style.set_property("background", "rgba(0, 0, 0, 0.8)").ok();
    style.set_property("color", "#fff").ok();
    style.set_property("padding", "10px 20px").ok();
    style.set_property("border-radius", "4px").ok();
    style.set_property("z-index", "10000").ok();

    if body.append_child(&toast).is_ok() {
        wasm_bindgen_futures::spawn_local(async move {
            gloo_timers::future::TimeoutFuture::new(TOAST_MS).await;
            toast.remove();
        });
    }
}

/// CSS modifier for the status pill.
pub fn status_class(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "status-queued",
        JobStatus::Running => "status-running",
        JobStatus::Finished => "status-finished",
        JobStatus::Failed => "status-failed",
        JobStatus::Unknown => "status-unknown",
    }
}

pub fn download_label(mode: DownloadMode, streamed: bool) -> String {
    let mode = match mode {
        DownloadMode::Full => "full",
        DownloadMode::Lite => "lite",
    };
    if streamed {
        format!("Save {} (streamed)", mode)
    } else {
        format!("Download {}", mode)
    }
}

/// `type` attribute of the `<input>` used for a field. `None` for choices,
/// which render as a `<select>`.
pub fn input_type(kind: FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Choice(_) => None,
        FieldKind::Date => Some("date"),
        FieldKind::Integer { .. } | FieldKind::Float { .. } => Some("number"),
        FieldKind::Flag => Some("checkbox"),
        FieldKind::Text => Some("text"),
    }
}
