use async_trait::async_trait;
use interaction_hub_registry::ApplicationCommandSpec;
use reqwest::{header::AUTHORIZATION, Client};
use thiserror::Error;
use tracing::{info, instrument};

use super::http::PlatformClient;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("command publication is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("platform rejected command specs (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("platform request timed out")]
    Timeout,
    #[error("platform request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PublishError::Timeout
        } else {
            PublishError::Transport(err.to_string())
        }
    }
}

/// Administrative surface that replaces the application's published
/// command set.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    /// Replaces the full command set and returns how many specs were sent.
    async fn bulk_set(&self, specs: &[ApplicationCommandSpec]) -> Result<usize, PublishError>;
}

pub struct HttpCommandPublisher {
    http_client: Client,
    api_base: String,
    application_id: String,
    bot_token: String,
}

impl HttpCommandPublisher {
    pub fn new(client: &PlatformClient, application_id: &str, bot_token: &str) -> Self {
        Self {
            http_client: client.http_client().clone(),
            api_base: client.api_base().to_string(),
            application_id: application_id.to_string(),
            bot_token: bot_token.to_string(),
        }
    }
}

#[async_trait]
impl CommandPublisher for HttpCommandPublisher {
    #[instrument(skip(self, specs), fields(count = specs.len()))]
    async fn bulk_set(&self, specs: &[ApplicationCommandSpec]) -> Result<usize, PublishError> {
        if self.application_id.is_empty() {
            return Err(PublishError::NotConfigured("application id is empty"));
        }

        let url = format!(
            "{}/applications/{}/commands",
            self.api_base, self.application_id
        );
        let response = self
            .http_client
            .put(url)
            .header(AUTHORIZATION, format!("Bot {}", self.bot_token))
            .json(specs)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable response body".to_string());
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        info!(count = specs.len(), "published application commands");
        Ok(specs.len())
    }
}
