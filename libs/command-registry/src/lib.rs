//! Command descriptors, the routing table built from them, and the
//! publishable command specs derived from that table.
//!
//! The registry is generic over the handler type `H` so it carries no
//! knowledge of how handlers are invoked.

pub mod descriptor;
pub mod path;
pub mod policy;
pub mod registry;
pub mod spec;
pub mod validator;

use thiserror::Error;

pub use descriptor::{
    CommandDescriptor, ComponentDescriptor, ContextMenuDescriptor, GroupAction, InteractionKind,
    ModalDescriptor, OptionChoice, OptionKind, OptionSchema, SlashCommandDescriptor,
    SubcommandGroup,
};
pub use path::RoutingPath;
pub use policy::{
    AccessLevel, Category, CommandPolicy, ContextKind, ExecutionEnvironment, Permission,
    PermissionSet,
};
pub use registry::{CommandRegistry, RegistryBuilder, RoutingTable};
pub use spec::{ApplicationCommandSpec, CommandOptionSpec, CommandType, OptionType};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{kind} '{identifier}' is already registered")]
    DuplicateIdentifier {
        kind: InteractionKind,
        identifier: String,
    },

    #[error("'{group}' under /{command} collides with an existing {existing}")]
    GroupConflict {
        command: String,
        group: String,
        existing: &'static str,
    },

    #[error("/{command} cannot be both a command and a parent of subcommands")]
    ShapeConflict { command: String },

    #[error("subcommand group '{group}' under /{command} was never declared")]
    UndeclaredGroup { command: String, group: String },

    #[error("invalid descriptor '{identifier}': {reason}")]
    InvalidDescriptor { identifier: String, reason: String },

    #[error("routing table lock poisoned")]
    Poisoned,
}

impl RegistryError {
    /// Registration conflicts, as opposed to malformed descriptors.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RegistryError::DuplicateIdentifier { .. }
                | RegistryError::GroupConflict { .. }
                | RegistryError::ShapeConflict { .. }
                | RegistryError::UndeclaredGroup { .. }
        )
    }
}

/// No descriptor matched an inbound interaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no {kind} route for '{identifier}'")]
pub struct RouteNotFound {
    pub kind: InteractionKind,
    pub identifier: String,
}
