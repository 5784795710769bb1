use std::sync::Arc;

use async_trait::async_trait;
use interaction_hub_registry::{
    Category, CommandDescriptor, CommandPolicy, RoutingPath, SlashCommandDescriptor,
};

use crate::platform::ReplyMessage;
use crate::router::{CommandHandler, Descriptor, HandlerContext};

pub struct PingHandler;

#[async_trait]
impl CommandHandler for PingHandler {
    async fn handle(&self, ctx: HandlerContext) -> anyhow::Result<()> {
        let latency_ms = ctx.elapsed().as_millis();
        ctx.ack()
            .reply(ReplyMessage::new(format!(
                "Pong! Acknowledged in **{latency_ms} ms**."
            )))
            .await?;
        Ok(())
    }
}

pub fn descriptor() -> Descriptor {
    CommandDescriptor::SlashCommand(SlashCommandDescriptor {
        path: RoutingPath::command("ping"),
        description: "displays the response latency of the bot".to_string(),
        options: Vec::new(),
        policy: CommandPolicy::default(),
        category: Category::HelpAndInformation,
        handler: Arc::new(PingHandler),
    })
}
