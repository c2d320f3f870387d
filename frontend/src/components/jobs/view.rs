//! View of the job console.
//!
//! Layout, top to bottom: header with the backend health badge, tool
//! selector, input file, the current tool's options (rendered from its
//! descriptor), actions, job status with download buttons, and the log tail.

use common::jobs::DownloadMode;
use common::model::params::ParamValue;
use common::model::tool::{FieldKind, ParamField, Tool};
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::html::Scope;
use yew::prelude::*;

use crate::job_controller::PollerState;

use super::helpers::{download_label, input_type, status_class};
use super::messages::Msg;
use super::state::{Health, JobConsole};

pub fn view(console: &JobConsole, ctx: &Context<JobConsole>) -> Html {
    let link = ctx.link();

    html! {
        <div class="job-console">
            { build_header(console) }
            { build_tool_section(console, link) }
            { build_file_section(console, link) }
            { build_params_section(console, link) }
            { build_actions(console, link) }
            { build_status_section(console, link) }
            { build_logs(console) }
        </div>
    }
}

fn build_header(console: &JobConsole) -> Html {
    let (class, label) = match console.health {
        Health::Checking => ("health-badge checking", "checking backend…"),
        Health::Up => ("health-badge up", "backend online"),
        Health::Down => ("health-badge down", "backend unreachable"),
    };
    html! {
        <header>
            <h1>{"Protein Tools"}</h1>
            <span class={class}>{label}</span>
        </header>
    }
}

fn build_tool_section(console: &JobConsole, link: &Scope<JobConsole>) -> Html {
    let onchange = link.batch_callback(|e: Event| {
        let select: HtmlSelectElement = e.target_unchecked_into();
        Tool::from_key(&select.value()).map(Msg::SelectTool)
    });

    html! {
        <section class="tool-section">
            <label>
                <strong>{"Tool: "}</strong>
                <select {onchange}>
                    { for Tool::ALL.iter().map(|tool| html! {
                        <option value={tool.key()} selected={*tool == console.tool}>
                            { tool.descriptor().label }
                        </option>
                    }) }
                </select>
            </label>
        </section>
    }
}

fn build_file_section(console: &JobConsole, link: &Scope<JobConsole>) -> Html {
    let descriptor = console.tool.descriptor();
    let onchange = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        Msg::FileChosen(input.files().and_then(|files| files.get(0)))
    });

    html! {
        <section class="file-section">
            <input
                type="file"
                ref={console.file_input_ref.clone()}
                accept={descriptor.accept_attribute()}
                {onchange}
            />
            <div class="hint">{ descriptor.input_hint }</div>
        </section>
    }
}

fn build_params_section(console: &JobConsole, link: &Scope<JobConsole>) -> Html {
    let descriptor = console.tool.descriptor();
    let params = console.current_params();

    html! {
        <section class="params-section">
            <h3>{ format!("{} parameters", descriptor.label) }</h3>
            { for descriptor.fields.iter().map(|field| {
                build_field(field, params.get(field.name), link)
            }) }
        </section>
    }
}

/// One labelled control for `field`, showing `value` (or the default).
fn build_field(field: &'static ParamField, value: Option<&ParamValue>, link: &Scope<JobConsole>) -> Html {
    let name = field.name;
    let current = value
        .map(ParamValue::to_form_value)
        .unwrap_or_else(|| field.default.to_string());

    let control = match field.kind {
        FieldKind::Choice(options) => {
            let onchange = link.callback(move |e: Event| {
                let select: HtmlSelectElement = e.target_unchecked_into();
                Msg::SetParam { name, raw: select.value() }
            });
            html! {
                <select {onchange}>
                    { for options.iter().map(|option| html! {
                        <option value={*option} selected={*option == current}>{ *option }</option>
                    }) }
                </select>
            }
        }
        FieldKind::Flag => {
            let onchange = link.callback(move |e: Event| {
                let input: HtmlInputElement = e.target_unchecked_into();
                Msg::SetParam { name, raw: input.checked().to_string() }
            });
            html! {
                <input type="checkbox" checked={current == "true"} {onchange} />
            }
        }
        kind => {
            let onchange = link.callback(move |e: Event| {
                let input: HtmlInputElement = e.target_unchecked_into();
                Msg::SetParam { name, raw: input.value() }
            });
            let (min, max, step) = match kind {
                FieldKind::Integer { min, max } => {
                    (Some(min.to_string()), Some(max.to_string()), None)
                }
                FieldKind::Float { min, max, step } => {
                    (Some(min.to_string()), Some(max.to_string()), Some(step.to_string()))
                }
                _ => (None, None, None),
            };
            html! {
                <input
                    type={input_type(kind).unwrap_or("text")}
                    value={current}
                    {min}
                    {max}
                    {step}
                    {onchange}
                />
            }
        }
    };

    html! {
        <div class="param-field">
            <label><strong>{ format!("{}: ", name) }</strong>{ control }</label>
        </div>
    }
}

fn build_actions(console: &JobConsole, link: &Scope<JobConsole>) -> Html {
    let onsubmit = link.callback(|e: SubmitEvent| {
        e.prevent_default();
        Msg::Submit
    });

    html! {
        <form class="actions" {onsubmit}>
            <button type="submit" disabled={console.submitting}>
                { if console.submitting { "Submitting…" } else { "Submit" } }
            </button>
            <button
                type="button"
                disabled={!console.job_active()}
                onclick={link.callback(|_| Msg::CancelJob)}
            >
                {"Cancel job"}
            </button>
            <button
                type="button"
                disabled={console.job.is_none()}
                onclick={link.callback(|_| Msg::ClearJob)}
            >
                {"Clear job"}
            </button>
        </form>
    }
}

fn build_status_section(console: &JobConsole, link: &Scope<JobConsole>) -> Html {
    let Some(job) = console.job.as_ref() else {
        return html! {
            <section class="status-section">
                <div><strong>{"Job ID: "}</strong>{"-"}</div>
                <div><strong>{"Status: "}</strong>{"idle"}</div>
            </section>
        };
    };

    let can_download = console.can_download();
    let download_button = |mode: DownloadMode, streamed: bool| {
        html! {
            <button
                disabled={!can_download}
                onclick={link.callback(move |_| Msg::Download { mode, streamed })}
            >
                { download_label(mode, streamed) }
            </button>
        }
    };

    html! {
        <section class="status-section">
            <div><strong>{"Job ID: "}</strong>{ job.id.as_str() }</div>
            <div>
                <strong>{"Status: "}</strong>
                <span class={classes!("status-pill", status_class(job.status))}>
                    { job.status.as_str() }
                </span>
                {
                    if matches!(console.poller.state(), PollerState::Polling(_)) {
                        html! { <span class="polling">{" polling…"}</span> }
                    } else {
                        html! {}
                    }
                }
                {
                    match job.exit_code {
                        Some(code) => html! { <span class="exit-code">{ format!(" (exit {})", code) }</span> },
                        None => html! {},
                    }
                }
            </div>
            {
                match console.snapshot.as_ref().and_then(|snapshot| snapshot.last_error.as_ref()) {
                    Some(err) => html! { <div class="poll-error">{ err.clone() }</div> },
                    None => html! {},
                }
            }
            <div class="downloads">
                { download_button(DownloadMode::Full, false) }
                { download_button(DownloadMode::Lite, false) }
                { download_button(DownloadMode::Full, true) }
                { download_button(DownloadMode::Lite, true) }
            </div>
        </section>
    }
}

fn build_logs(console: &JobConsole) -> Html {
    let logs = console
        .snapshot
        .as_ref()
        .map(|snapshot| snapshot.logs.as_str())
        .filter(|logs| !logs.is_empty())
        .unwrap_or("(waiting…)");

    html! {
        <section class="logs-section">
            <strong>{"Logs"}</strong>
            <pre class="logs">{ logs }</pre>
        </section>
    }
}
