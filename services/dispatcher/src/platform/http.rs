use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::interaction::InteractionEnvelope;

use super::responder::{
    AckError, InteractionResponder, ModalSpec, ReplyMessage, ResponderFactory,
};

const CALLBACK_CHANNEL_MESSAGE: u8 = 4;
const CALLBACK_DEFERRED_CHANNEL_MESSAGE: u8 = 5;
const CALLBACK_MODAL: u8 = 9;
const FLAG_EPHEMERAL: u64 = 1 << 6;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_TEXT_INPUT: u8 = 4;

/// Shared REST client for the host platform. Hands out per-interaction
/// responders that reuse its connection pool.
#[derive(Clone)]
pub struct PlatformClient {
    http_client: Client,
    api_base: String,
    application_id: String,
}

impl PlatformClient {
    pub fn new(api_base: &str, application_id: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            application_id: application_id.to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn responder_for(&self, envelope: &InteractionEnvelope) -> HttpInteractionResponder {
        HttpInteractionResponder {
            client: self.clone(),
            interaction_id: envelope.interaction_id.clone(),
            token: envelope.token.clone(),
        }
    }
}

impl ResponderFactory for PlatformClient {
    fn responder(&self, envelope: &InteractionEnvelope) -> Arc<dyn InteractionResponder> {
        Arc::new(self.responder_for(envelope))
    }
}

/// [`InteractionResponder`] backed by the platform's interaction callback
/// and webhook endpoints.
pub struct HttpInteractionResponder {
    client: PlatformClient,
    interaction_id: String,
    token: String,
}

impl HttpInteractionResponder {
    fn callback_url(&self) -> String {
        format!(
            "{}/interactions/{}/{}/callback",
            self.client.api_base, self.interaction_id, self.token
        )
    }

    fn webhook_url(&self) -> String {
        format!(
            "{}/webhooks/{}/{}",
            self.client.api_base, self.client.application_id, self.token
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(), AckError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unreadable response body".to_string());
        Err(AckError::Platform {
            status: status.as_u16(),
            message,
        })
    }

    async fn callback(&self, body: Value) -> Result<(), AckError> {
        let request = self.client.http_client.post(self.callback_url()).json(&body);
        self.send(request).await
    }
}

fn message_body(message: &ReplyMessage) -> Value {
    let mut body = json!({ "content": message.content });
    if message.ephemeral {
        body["flags"] = json!(FLAG_EPHEMERAL);
    }
    body
}

fn modal_body(modal: &ModalSpec) -> Value {
    let rows: Vec<Value> = modal
        .fields
        .iter()
        .map(|field| {
            let mut input = json!({
                "type": COMPONENT_TEXT_INPUT,
                "custom_id": field.custom_id,
                "label": field.label,
                "style": field.style.code(),
                "required": field.required,
            });
            if let Some(placeholder) = &field.placeholder {
                input["placeholder"] = json!(placeholder);
            }
            if let Some(max_length) = field.max_length {
                input["max_length"] = json!(max_length);
            }
            json!({ "type": COMPONENT_ACTION_ROW, "components": [input] })
        })
        .collect();

    json!({
        "custom_id": modal.custom_id,
        "title": modal.title,
        "components": rows,
    })
}

#[async_trait]
impl InteractionResponder for HttpInteractionResponder {
    #[instrument(skip(self, message), fields(interaction_id = %self.interaction_id))]
    async fn reply(&self, message: &ReplyMessage) -> Result<(), AckError> {
        self.callback(json!({
            "type": CALLBACK_CHANNEL_MESSAGE,
            "data": message_body(message),
        }))
        .await
    }

    #[instrument(skip(self), fields(interaction_id = %self.interaction_id))]
    async fn defer_reply(&self, ephemeral: bool) -> Result<(), AckError> {
        let mut body = json!({ "type": CALLBACK_DEFERRED_CHANNEL_MESSAGE });
        if ephemeral {
            body["data"] = json!({ "flags": FLAG_EPHEMERAL });
        }
        self.callback(body).await
    }

    #[instrument(skip(self, modal), fields(interaction_id = %self.interaction_id))]
    async fn show_modal(&self, modal: &ModalSpec) -> Result<(), AckError> {
        self.callback(json!({
            "type": CALLBACK_MODAL,
            "data": modal_body(modal),
        }))
        .await
    }

    #[instrument(skip(self, content), fields(interaction_id = %self.interaction_id))]
    async fn edit_reply(&self, content: &str) -> Result<(), AckError> {
        let url = format!("{}/messages/@original", self.webhook_url());
        debug!("editing original response");
        let request = self
            .client
            .http_client
            .patch(url)
            .json(&json!({ "content": content }));
        self.send(request).await
    }

    #[instrument(skip(self, message), fields(interaction_id = %self.interaction_id))]
    async fn follow_up(&self, message: &ReplyMessage) -> Result<(), AckError> {
        let request = self
            .client
            .http_client
            .post(self.webhook_url())
            .json(&message_body(message));
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::responder::{ModalField, TextInputStyle};

    #[test]
    fn ephemeral_flag_only_when_requested() {
        assert_eq!(
            message_body(&ReplyMessage::new("hi")),
            json!({ "content": "hi" })
        );
        assert_eq!(
            message_body(&ReplyMessage::ephemeral("hi")),
            json!({ "content": "hi", "flags": 64 })
        );
    }

    #[test]
    fn modal_fields_wrap_in_action_rows() {
        let body = modal_body(&ModalSpec {
            custom_id: "feedback_modal".into(),
            title: "Feedback".into(),
            fields: vec![ModalField {
                custom_id: "message".into(),
                label: "Message".into(),
                style: TextInputStyle::Paragraph,
                required: true,
                placeholder: None,
                max_length: Some(1000),
            }],
        });

        assert_eq!(body["components"][0]["type"], 1);
        let input = &body["components"][0]["components"][0];
        assert_eq!(input["type"], 4);
        assert_eq!(input["style"], 2);
        assert_eq!(input["max_length"], 1000);
        assert!(input.get("placeholder").is_none());
    }
}
