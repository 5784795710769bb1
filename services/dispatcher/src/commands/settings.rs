//! `/settings` and its per-feature sub-registries. Every action defers,
//! mutates or reads the tenant's configuration, then edits the deferred
//! response.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use interaction_hub_registry::{
    AccessLevel, Category, CommandPolicy, ExecutionEnvironment, GroupAction, OptionKind,
    OptionSchema, Permission, RegistryError, SubcommandGroup,
};

use crate::router::{CommandHandler, DispatchRegistryBuilder, HandlerContext, SharedHandler};
use crate::tenant::{AiChatMode, TenantSettings};

pub const COMMAND: &str = "settings";

fn policy() -> CommandPolicy {
    CommandPolicy::new(ExecutionEnvironment::TenantOnly, AccessLevel::TenantAdmin)
        .with_bot_permissions([Permission::ViewChannel, Permission::SendMessages])
}

fn action(
    name: &str,
    description: &str,
    options: Vec<OptionSchema>,
    handler: SharedHandler,
) -> GroupAction<SharedHandler> {
    GroupAction {
        name: name.to_string(),
        description: description.to_string(),
        options,
        policy: policy(),
        category: Category::TenantAdmin,
        handler,
    }
}

/// Snowflake-like option that may arrive as a string or a number.
fn id_option(ctx: &HandlerContext, name: &str) -> anyhow::Result<String> {
    ctx.option_str(name)
        .map(str::to_string)
        .or_else(|| ctx.option_i64(name).map(|id| id.to_string()))
        .ok_or_else(|| anyhow!("missing required option '{name}'"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRolesAction {
    Help,
    List,
    Add,
    Remove,
    Reset,
}

pub struct AdminRolesHandler {
    action: AdminRolesAction,
}

#[async_trait]
impl CommandHandler for AdminRolesHandler {
    async fn handle(&self, ctx: HandlerContext) -> anyhow::Result<()> {
        ctx.ack().defer_reply(false).await?;
        let tenant_id = ctx.tenant_id()?;
        let user = format!("<@{}>", ctx.envelope().requester_id);

        let content = match self.action {
            AdminRolesAction::Help => format!(
                "{user}, server admin roles is a feature that allows you to assign roles to be recognized as server admins by me.\n\n\
                 By default only members with the `Administrator` or `Manage Server` permission can run my server admin commands.\n\
                 If you want another role to have access to my server admin commands, add that role using this command.\n\n\
                 By default, the server admin roles list is empty."
            ),
            AdminRolesAction::List => {
                let config = ctx.tenant_config().await?;
                list_admin_roles(&user, &config.settings)
            }
            AdminRolesAction::Add => {
                let role_id = id_option(&ctx, "role")?;
                let (_, added) = ctx
                    .tenants()
                    .update_with(tenant_id, |settings| {
                        if settings.admin_role_ids.contains(&role_id) {
                            false
                        } else {
                            settings.admin_role_ids.push(role_id.clone());
                            true
                        }
                    })
                    .await?;
                if added {
                    format!("{user}, added <@&{role_id}> to the server admin roles list.")
                } else {
                    format!("{user}, <@&{role_id}> is already in the server admin roles list.")
                }
            }
            AdminRolesAction::Remove => {
                let role_id = id_option(&ctx, "role")?;
                let (_, removed) = ctx
                    .tenants()
                    .update_with(tenant_id, |settings| {
                        let before = settings.admin_role_ids.len();
                        settings.admin_role_ids.retain(|id| id != &role_id);
                        settings.admin_role_ids.len() != before
                    })
                    .await?;
                if removed {
                    format!("{user}, removed <@&{role_id}> from the server admin roles list.")
                } else {
                    format!("{user}, <@&{role_id}> is not in the server admin roles list.")
                }
            }
            AdminRolesAction::Reset => {
                ctx.tenants()
                    .update(tenant_id, |settings| settings.admin_role_ids.clear())
                    .await?;
                format!("{user}, reset the server admin roles list.")
            }
        };

        ctx.ack().edit_reply(content).await?;
        Ok(())
    }
}

fn list_admin_roles(user: &str, settings: &TenantSettings) -> String {
    if settings.admin_role_ids.is_empty() {
        return format!("{user}, the server admin roles list is empty.");
    }
    let roles: Vec<String> = settings
        .admin_role_ids
        .iter()
        .map(|id| format!("- <@&{id}>"))
        .collect();
    format!(
        "{user}, here are the current server admin roles:\n{}",
        roles.join("\n")
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiChatAction {
    Mode,
    AddChannel,
    RemoveChannel,
    List,
}

pub struct AiChatHandler {
    action: AiChatAction,
}

#[async_trait]
impl CommandHandler for AiChatHandler {
    async fn handle(&self, ctx: HandlerContext) -> anyhow::Result<()> {
        ctx.ack().defer_reply(false).await?;
        let tenant_id = ctx.tenant_id()?;
        let user = format!("<@{}>", ctx.envelope().requester_id);

        let content = match self.action {
            AiChatAction::Mode => {
                let requested = ctx
                    .option_str("mode")
                    .ok_or_else(|| anyhow!("missing required option 'mode'"))?;
                match AiChatMode::parse(requested) {
                    Some(mode) => {
                        ctx.tenants()
                            .update(tenant_id, |settings| settings.ai_chat_mode = mode)
                            .await?;
                        format!("{user}, set the ai chat mode to `{}`.", mode.as_str())
                    }
                    None => format!("{user}, `{requested}` is not a valid ai chat mode."),
                }
            }
            AiChatAction::AddChannel => {
                let channel_id = id_option(&ctx, "channel")?;
                let (_, added) = ctx
                    .tenants()
                    .update_with(tenant_id, |settings| {
                        if settings.ai_chat_channel_ids.contains(&channel_id) {
                            false
                        } else {
                            settings.ai_chat_channel_ids.push(channel_id.clone());
                            true
                        }
                    })
                    .await?;
                if added {
                    format!("{user}, added <#{channel_id}> to the ai chat channels.")
                } else {
                    format!("{user}, <#{channel_id}> is already an ai chat channel.")
                }
            }
            AiChatAction::RemoveChannel => {
                let channel_id = id_option(&ctx, "channel")?;
                let (_, removed) = ctx
                    .tenants()
                    .update_with(tenant_id, |settings| {
                        let before = settings.ai_chat_channel_ids.len();
                        settings.ai_chat_channel_ids.retain(|id| id != &channel_id);
                        settings.ai_chat_channel_ids.len() != before
                    })
                    .await?;
                if removed {
                    format!("{user}, removed <#{channel_id}> from the ai chat channels.")
                } else {
                    format!("{user}, <#{channel_id}> is not an ai chat channel.")
                }
            }
            AiChatAction::List => {
                let config = ctx.tenant_config().await?;
                list_ai_chat(&user, &config.settings)
            }
        };

        ctx.ack().edit_reply(content).await?;
        Ok(())
    }
}

fn list_ai_chat(user: &str, settings: &TenantSettings) -> String {
    let mut lines = vec![format!(
        "{user}, the ai chat mode is `{}`.",
        settings.ai_chat_mode.as_str()
    )];
    if settings.ai_chat_channel_ids.is_empty() {
        lines.push("No ai chat channels are configured.".to_string());
    } else {
        lines.push("AI chat channels:".to_string());
        lines.extend(
            settings
                .ai_chat_channel_ids
                .iter()
                .map(|id| format!("- <#{id}>")),
        );
    }
    lines.join("\n")
}

fn admin_roles(action: AdminRolesAction) -> SharedHandler {
    Arc::new(AdminRolesHandler { action })
}

fn ai_chat(action: AiChatAction) -> SharedHandler {
    Arc::new(AiChatHandler { action })
}

pub fn register(builder: &mut DispatchRegistryBuilder) -> Result<(), RegistryError> {
    builder.declare_command(COMMAND, "configure how I behave in this server")?;

    let role = || OptionSchema::new(OptionKind::Role, "role", "the role to use").required();
    builder.register_group(
        COMMAND,
        SubcommandGroup::new("server_admin_roles", "roles recognized as server admins")
            .action(action(
                "help",
                "displays information about the server admin roles feature",
                Vec::new(),
                admin_roles(AdminRolesAction::Help),
            ))
            .action(action(
                "list",
                "lists all roles in the server admins list",
                Vec::new(),
                admin_roles(AdminRolesAction::List),
            ))
            .action(action(
                "add",
                "adds a specified role to the admins list",
                vec![role()],
                admin_roles(AdminRolesAction::Add),
            ))
            .action(action(
                "remove",
                "removes a specified role from the admins list",
                vec![role()],
                admin_roles(AdminRolesAction::Remove),
            ))
            .action(action(
                "reset",
                "resets back to default",
                Vec::new(),
                admin_roles(AdminRolesAction::Reset),
            )),
    )?;

    let channel =
        || OptionSchema::new(OptionKind::Channel, "channel", "the channel to use").required();
    let mode = OptionSchema::new(OptionKind::String, "mode", "when I should respond")
        .required()
        .choice("Disabled", AiChatMode::Disabled.as_str())
        .choice("Require Mention", AiChatMode::RequireMention.as_str())
        .choice("Always Respond", AiChatMode::AlwaysRespond.as_str());
    builder.register_group(
        COMMAND,
        SubcommandGroup::new("ai_chat", "where and how I chat with members")
            .action(action(
                "mode",
                "sets when I respond in ai chat channels",
                vec![mode],
                ai_chat(AiChatAction::Mode),
            ))
            .action(action(
                "add_channel",
                "adds a channel to the ai chat channels",
                vec![channel()],
                ai_chat(AiChatAction::AddChannel),
            ))
            .action(action(
                "remove_channel",
                "removes a channel from the ai chat channels",
                vec![channel()],
                ai_chat(AiChatAction::RemoveChannel),
            ))
            .action(action(
                "list",
                "lists the ai chat mode and channels",
                Vec::new(),
                ai_chat(AiChatAction::List),
            )),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_admin_role_list_is_called_out() {
        let settings = TenantSettings::default();
        assert_eq!(
            list_admin_roles("<@1>", &settings),
            "<@1>, the server admin roles list is empty."
        );
    }

    #[test]
    fn ai_chat_listing_includes_mode_and_channels() {
        let settings = TenantSettings {
            ai_chat_mode: AiChatMode::RequireMention,
            ai_chat_channel_ids: vec!["5".into()],
            ..TenantSettings::default()
        };
        let text = list_ai_chat("<@1>", &settings);
        assert!(text.contains("`require_mention`"));
        assert!(text.ends_with("- <#5>"));
    }
}
