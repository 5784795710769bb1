use std::sync::Arc;

use async_trait::async_trait;
use interaction_hub_registry::{
    Category, CommandDescriptor, CommandPolicy, ComponentDescriptor, ModalDescriptor,
    RegistryError, RoutingPath, SlashCommandDescriptor,
};

use crate::diagnostics::DiagnosticKind;
use crate::platform::{ModalField, ModalSpec, ReplyMessage, TextInputStyle};
use crate::router::{CommandHandler, DispatchRegistryBuilder, HandlerContext};

pub const MODAL_ID: &str = "feedback_modal";
pub const BUTTON_ID: &str = "feedback_open";
pub const MESSAGE_FIELD: &str = "message";

const MIN_MESSAGE_LEN: usize = 16;
const MAX_MESSAGE_LEN: u16 = 1024;

pub fn feedback_modal() -> ModalSpec {
    ModalSpec {
        custom_id: MODAL_ID.to_string(),
        title: "Send Feedback".to_string(),
        fields: vec![ModalField {
            custom_id: MESSAGE_FIELD.to_string(),
            label: "Tell us what you think".to_string(),
            style: TextInputStyle::Paragraph,
            required: true,
            placeholder: None,
            max_length: Some(MAX_MESSAGE_LEN),
        }],
    }
}

/// Opens the feedback modal, from `/feedback` or the feedback button.
pub struct OpenFeedbackHandler;

#[async_trait]
impl CommandHandler for OpenFeedbackHandler {
    async fn handle(&self, ctx: HandlerContext) -> anyhow::Result<()> {
        ctx.ack().show_modal(feedback_modal()).await?;
        Ok(())
    }
}

pub struct SubmitFeedbackHandler;

#[async_trait]
impl CommandHandler for SubmitFeedbackHandler {
    async fn handle(&self, ctx: HandlerContext) -> anyhow::Result<()> {
        let requester = &ctx.envelope().requester_id;
        let message = ctx.option_str(MESSAGE_FIELD).unwrap_or_default().trim();

        if message.chars().count() < MIN_MESSAGE_LEN {
            ctx.ack()
                .reply(ReplyMessage::ephemeral(format!(
                    "<@{requester}>, your feedback must be at least {MIN_MESSAGE_LEN} characters long."
                )))
                .await?;
            return Ok(());
        }

        ctx.record(DiagnosticKind::Feedback, format!("{requester}: {message}"));
        let quoted = code_block_safe(message);
        ctx.ack()
            .reply(ReplyMessage::ephemeral(format!(
                "**Thank you for your feedback!**\n<@{requester}>, I sent the following message to my developers:\n```\n{quoted}\n```"
            )))
            .await?;
        Ok(())
    }
}

/// Swaps backticks for U+02CB so user text cannot close the code fence.
fn code_block_safe(text: &str) -> String {
    text.replace('`', "\u{2cb}")
}

pub fn register(builder: &mut DispatchRegistryBuilder) -> Result<(), RegistryError> {
    builder.register(CommandDescriptor::SlashCommand(SlashCommandDescriptor {
        path: RoutingPath::command("feedback"),
        description: "sends feedback to my developers".to_string(),
        options: Vec::new(),
        policy: CommandPolicy::default(),
        category: Category::HelpAndInformation,
        handler: Arc::new(OpenFeedbackHandler),
    }))?;

    builder.register(CommandDescriptor::Component(ComponentDescriptor {
        custom_id: BUTTON_ID.to_string(),
        policy: CommandPolicy::default(),
        category: Category::HelpAndInformation,
        handler: Arc::new(OpenFeedbackHandler),
    }))?;

    builder.register(CommandDescriptor::Modal(ModalDescriptor {
        custom_id: MODAL_ID.to_string(),
        title: feedback_modal().title,
        policy: CommandPolicy::default(),
        category: Category::HelpAndInformation,
        handler: Arc::new(SubmitFeedbackHandler),
    }))?;

    Ok(())
}
