//! Job console: submit a job, follow its status and log tail, fetch results.
//!
//! Split the same way as the other components: `state` holds the runtime
//! data, `update` handles messages, `view` renders, `helpers` has the toast
//! and small formatting functions.

use yew::platform::spawn_local;
use yew::prelude::*;

mod helpers;
mod messages;
mod props;
mod state;
mod update;
mod view;

pub use messages::Msg;
pub use props::JobConsoleProps;
pub use state::JobConsole;

impl Component for JobConsole {
    type Message = Msg;
    type Properties = JobConsoleProps;

    fn create(ctx: &Context<Self>) -> Self {
        JobConsole::new(&ctx.props().config)
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        update::update(self, ctx, msg)
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        view::view(self, ctx)
    }

    fn rendered(&mut self, ctx: &Context<Self>, first_render: bool) {
        if first_render {
            let client = self.client.clone();
            let link = ctx.link().clone();
            spawn_local(async move {
                let up = match client.health().await {
                    Ok(()) => true,
                    Err(err) => {
                        log::warn!("health check failed: {}", err);
                        false
                    }
                };
                link.send_message(Msg::HealthChecked(up));
            });
        }
    }
}
