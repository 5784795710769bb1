use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interaction::InteractionEnvelope;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub content: String,
    #[serde(default)]
    pub ephemeral: bool,
}

impl ReplyMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextInputStyle {
    Short,
    Paragraph,
}

impl TextInputStyle {
    pub fn code(&self) -> u8 {
        match self {
            TextInputStyle::Short => 1,
            TextInputStyle::Paragraph => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalField {
    pub custom_id: String,
    pub label: String,
    pub style: TextInputStyle,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub max_length: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalSpec {
    pub custom_id: String,
    pub title: String,
    pub fields: Vec<ModalField>,
}

#[derive(Debug, Error)]
pub enum AckError {
    #[error("interaction was already acknowledged")]
    AlreadyAcknowledged,
    #[error("interaction has not been acknowledged yet")]
    NotAcknowledged,
    #[error("platform returned status {status}: {message}")]
    Platform { status: u16, message: String },
    #[error("platform request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for AckError {
    fn from(err: reqwest::Error) -> Self {
        AckError::Transport(err.to_string())
    }
}

/// Acknowledgment primitives for a single interaction.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn reply(&self, message: &ReplyMessage) -> Result<(), AckError>;

    async fn defer_reply(&self, ephemeral: bool) -> Result<(), AckError>;

    async fn show_modal(&self, modal: &ModalSpec) -> Result<(), AckError>;

    async fn edit_reply(&self, content: &str) -> Result<(), AckError>;

    async fn follow_up(&self, message: &ReplyMessage) -> Result<(), AckError>;
}

/// Produces the responder for an inbound interaction.
pub trait ResponderFactory: Send + Sync {
    fn responder(&self, envelope: &InteractionEnvelope) -> Arc<dyn InteractionResponder>;
}
