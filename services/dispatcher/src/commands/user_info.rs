use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use interaction_hub_registry::{
    AccessLevel, Category, CommandDescriptor, CommandPolicy, ContextMenuDescriptor,
    ExecutionEnvironment, Permission,
};

use crate::router::{CommandHandler, Descriptor, HandlerContext};

pub const NAME: &str = "Quick User Info";

pub struct UserInfoHandler;

#[async_trait]
impl CommandHandler for UserInfoHandler {
    async fn handle(&self, ctx: HandlerContext) -> anyhow::Result<()> {
        ctx.ack().defer_reply(true).await?;

        let target_id = ctx
            .envelope()
            .target_id
            .as_deref()
            .ok_or_else(|| anyhow!("user context interaction without a target"))?;
        let level = ctx.full_access_level().await?;

        ctx.ack()
            .edit_reply(format!(
                "**Quick User Info**\nUser: <@{target_id}>\nSnowflake: `{target_id}`\nYour Access Level: {}",
                level.display_name()
            ))
            .await?;
        Ok(())
    }
}

pub fn descriptor() -> Descriptor {
    CommandDescriptor::UserContext(ContextMenuDescriptor {
        name: NAME.to_string(),
        policy: CommandPolicy::new(ExecutionEnvironment::TenantOnly, AccessLevel::Everyone)
            .with_bot_permissions([Permission::ViewChannel, Permission::SendMessages]),
        category: Category::Utilities,
        handler: Arc::new(UserInfoHandler),
    })
}
