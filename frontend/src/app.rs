use std::rc::Rc;

use yew::{html, Component, Context, Html, Properties};

use crate::components::jobs::JobConsole;
use crate::config::ClientConfig;

#[derive(Properties, PartialEq)]
pub struct AppProps {
    pub config: Rc<ClientConfig>,
}

pub struct App;

impl Component for App {
    type Message = ();
    type Properties = AppProps;

    fn create(_ctx: &Context<Self>) -> Self {
        Self
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <main>
                <JobConsole config={ctx.props().config.clone()} />
            </main>
        }
    }
}
