use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::RoutingPath;
use crate::policy::{Category, CommandPolicy};

/// Tag of an inbound interaction and of the descriptor able to serve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    SlashCommand,
    UserContext,
    MessageContext,
    Component,
    Modal,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::SlashCommand => "slash_command",
            InteractionKind::UserContext => "user_context",
            InteractionKind::MessageContext => "message_context",
            InteractionKind::Component => "component",
            InteractionKind::Modal => "modal",
        }
    }

    /// Components and modals are routed by custom id and never published.
    pub fn is_published(&self) -> bool {
        matches!(
            self,
            InteractionKind::SlashCommand
                | InteractionKind::UserContext
                | InteractionKind::MessageContext
        )
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: serde_json::Value,
}

/// One typed argument of a slash command leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSchema {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
}

impl OptionSchema {
    pub fn new(kind: OptionKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            min_value: None,
            max_value: None,
            choices: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.choices.push(OptionChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// Leaf of the slash command namespace.
#[derive(Debug, Clone)]
pub struct SlashCommandDescriptor<H> {
    pub path: RoutingPath,
    pub description: String,
    pub options: Vec<OptionSchema>,
    pub policy: CommandPolicy,
    pub category: Category,
    pub handler: H,
}

/// User or message context menu entry.
#[derive(Debug, Clone)]
pub struct ContextMenuDescriptor<H> {
    pub name: String,
    pub policy: CommandPolicy,
    pub category: Category,
    pub handler: H,
}

#[derive(Debug, Clone)]
pub struct ComponentDescriptor<H> {
    pub custom_id: String,
    pub policy: CommandPolicy,
    pub category: Category,
    pub handler: H,
}

#[derive(Debug, Clone)]
pub struct ModalDescriptor<H> {
    pub custom_id: String,
    pub title: String,
    pub policy: CommandPolicy,
    pub category: Category,
    pub handler: H,
}

/// Every routable entry, tagged by the interaction kind it serves.
#[derive(Debug, Clone)]
pub enum CommandDescriptor<H> {
    SlashCommand(SlashCommandDescriptor<H>),
    UserContext(ContextMenuDescriptor<H>),
    MessageContext(ContextMenuDescriptor<H>),
    Component(ComponentDescriptor<H>),
    Modal(ModalDescriptor<H>),
}

impl<H> CommandDescriptor<H> {
    pub fn kind(&self) -> InteractionKind {
        match self {
            CommandDescriptor::SlashCommand(_) => InteractionKind::SlashCommand,
            CommandDescriptor::UserContext(_) => InteractionKind::UserContext,
            CommandDescriptor::MessageContext(_) => InteractionKind::MessageContext,
            CommandDescriptor::Component(_) => InteractionKind::Component,
            CommandDescriptor::Modal(_) => InteractionKind::Modal,
        }
    }

    /// Routing key within the descriptor's kind. Slash commands use the
    /// space-joined path.
    pub fn identifier(&self) -> String {
        match self {
            CommandDescriptor::SlashCommand(d) => d.path.identifier(),
            CommandDescriptor::UserContext(d) | CommandDescriptor::MessageContext(d) => {
                d.name.clone()
            }
            CommandDescriptor::Component(d) => d.custom_id.clone(),
            CommandDescriptor::Modal(d) => d.custom_id.clone(),
        }
    }

    pub fn policy(&self) -> &CommandPolicy {
        match self {
            CommandDescriptor::SlashCommand(d) => &d.policy,
            CommandDescriptor::UserContext(d) | CommandDescriptor::MessageContext(d) => &d.policy,
            CommandDescriptor::Component(d) => &d.policy,
            CommandDescriptor::Modal(d) => &d.policy,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            CommandDescriptor::SlashCommand(d) => d.category,
            CommandDescriptor::UserContext(d) | CommandDescriptor::MessageContext(d) => d.category,
            CommandDescriptor::Component(d) => d.category,
            CommandDescriptor::Modal(d) => d.category,
        }
    }

    pub fn handler(&self) -> &H {
        match self {
            CommandDescriptor::SlashCommand(d) => &d.handler,
            CommandDescriptor::UserContext(d) | CommandDescriptor::MessageContext(d) => &d.handler,
            CommandDescriptor::Component(d) => &d.handler,
            CommandDescriptor::Modal(d) => &d.handler,
        }
    }

    pub fn options(&self) -> &[OptionSchema] {
        match self {
            CommandDescriptor::SlashCommand(d) => &d.options,
            _ => &[],
        }
    }

    pub fn routing_path(&self) -> Option<&RoutingPath> {
        match self {
            CommandDescriptor::SlashCommand(d) => Some(&d.path),
            _ => None,
        }
    }
}

/// One action inside a subcommand group.
#[derive(Debug, Clone)]
pub struct GroupAction<H> {
    pub name: String,
    pub description: String,
    pub options: Vec<OptionSchema>,
    pub policy: CommandPolicy,
    pub category: Category,
    pub handler: H,
}

/// A named setting or feature sub-registry folded under a top-level command
/// as `/command group action`.
#[derive(Debug, Clone)]
pub struct SubcommandGroup<H> {
    pub name: String,
    pub description: String,
    pub actions: Vec<GroupAction<H>>,
}

impl<H> SubcommandGroup<H> {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            actions: Vec::new(),
        }
    }

    pub fn action(mut self, action: GroupAction<H>) -> Self {
        self.actions.push(action);
        self
    }
}
