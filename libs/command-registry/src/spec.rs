//! Wire-format application command specs for bulk publication.

use serde::{Deserialize, Serialize};

use crate::descriptor::{OptionChoice, OptionKind, OptionSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CommandType {
    ChatInput,
    User,
    Message,
}

impl From<CommandType> for u8 {
    fn from(value: CommandType) -> Self {
        match value {
            CommandType::ChatInput => 1,
            CommandType::User => 2,
            CommandType::Message => 3,
        }
    }
}

impl TryFrom<u8> for CommandType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CommandType::ChatInput),
            2 => Ok(CommandType::User),
            3 => Ok(CommandType::Message),
            other => Err(format!("unknown command type {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OptionType {
    SubCommand,
    SubCommandGroup,
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

impl From<OptionType> for u8 {
    fn from(value: OptionType) -> Self {
        match value {
            OptionType::SubCommand => 1,
            OptionType::SubCommandGroup => 2,
            OptionType::String => 3,
            OptionType::Integer => 4,
            OptionType::Boolean => 5,
            OptionType::User => 6,
            OptionType::Channel => 7,
            OptionType::Role => 8,
            OptionType::Mentionable => 9,
            OptionType::Number => 10,
            OptionType::Attachment => 11,
        }
    }
}

impl TryFrom<u8> for OptionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => OptionType::SubCommand,
            2 => OptionType::SubCommandGroup,
            3 => OptionType::String,
            4 => OptionType::Integer,
            5 => OptionType::Boolean,
            6 => OptionType::User,
            7 => OptionType::Channel,
            8 => OptionType::Role,
            9 => OptionType::Mentionable,
            10 => OptionType::Number,
            11 => OptionType::Attachment,
            other => return Err(format!("unknown option type {other}")),
        })
    }
}

impl From<OptionKind> for OptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::String => OptionType::String,
            OptionKind::Integer => OptionType::Integer,
            OptionKind::Boolean => OptionType::Boolean,
            OptionKind::User => OptionType::User,
            OptionKind::Channel => OptionType::Channel,
            OptionKind::Role => OptionType::Role,
            OptionKind::Mentionable => OptionType::Mentionable,
            OptionKind::Number => OptionType::Number,
            OptionKind::Attachment => OptionType::Attachment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOptionSpec {
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<serde_json::Value>,
}

impl CommandOptionSpec {
    pub(crate) fn nested(
        option_type: OptionType,
        name: &str,
        description: &str,
        options: Vec<CommandOptionSpec>,
    ) -> Self {
        Self {
            option_type,
            name: name.to_string(),
            description: description.to_string(),
            required: None,
            options,
            choices: Vec::new(),
            min_value: None,
            max_value: None,
        }
    }
}

impl From<&OptionSchema> for CommandOptionSpec {
    fn from(schema: &OptionSchema) -> Self {
        let bound = |value: Option<f64>| value.map(|v| bound_value(schema.kind, v));
        Self {
            option_type: schema.kind.into(),
            name: schema.name.clone(),
            description: schema.description.clone(),
            required: schema.required.then_some(true),
            options: Vec::new(),
            choices: schema.choices.clone(),
            min_value: bound(schema.min_value),
            max_value: bound(schema.max_value),
        }
    }
}

// Integer options must carry integral bounds on the wire.
fn bound_value(kind: OptionKind, value: f64) -> serde_json::Value {
    if kind == OptionKind::Integer && value.fract() == 0.0 {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Value::from(value)
    }
}

/// One top-level entry of the bulk publication payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCommandSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionSpec>,
    pub dm_permission: bool,
}
