//! Properties of the [`JobConsole`](super::JobConsole).

use std::rc::Rc;

use yew::prelude::*;

use crate::config::ClientConfig;

#[derive(Properties, PartialEq, Clone)]
pub struct JobConsoleProps {
    /// Resolved client configuration. Read once when the console is created;
    /// later changes to the prop are not applied to a running console.
    pub config: Rc<ClientConfig>,
}
