use std::rc::Rc;

use log::LevelFilter;

use crate::app::{App, AppProps};
use crate::config::ClientConfig;

mod app;
mod components;
mod config;
mod job_controller;
mod logger;

fn main() {
    // Installed early so configuration warnings reach the console.
    logger::init(LevelFilter::Info);
    let config = ClientConfig::load();
    logger::init(config.log_level);
    log::info!("job console using API at '{}'", config.api_base);

    yew::Renderer::<App>::with_props(AppProps {
        config: Rc::new(config),
    })
    .render();
}
