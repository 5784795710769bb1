use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::platform::{AckError, InteractionResponder, ModalSpec, ReplyMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckState {
    Pending,
    Replied,
    Deferred { by_router: bool },
    ModalShown,
}

/// Who produced the interaction's first acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckSource {
    Handler,
    Fallback,
}

struct AckInner {
    responder: Arc<dyn InteractionResponder>,
    // Held across responder calls so two acknowledgments never race.
    state: Mutex<AckState>,
}

/// Acknowledgment surface handed to handlers. Clones share state, so the
/// router and the handler task observe the same acknowledgment.
#[derive(Clone)]
pub struct AckHandle {
    inner: Arc<AckInner>,
}

impl AckHandle {
    pub fn new(responder: Arc<dyn InteractionResponder>) -> Self {
        Self {
            inner: Arc::new(AckInner {
                responder,
                state: Mutex::new(AckState::Pending),
            }),
        }
    }

    pub async fn state(&self) -> AckState {
        *self.inner.state.lock().await
    }

    pub async fn is_acknowledged(&self) -> bool {
        self.state().await != AckState::Pending
    }

    pub async fn source(&self) -> Option<AckSource> {
        match self.state().await {
            AckState::Pending => None,
            AckState::Deferred { by_router: true } => Some(AckSource::Fallback),
            _ => Some(AckSource::Handler),
        }
    }

    /// Sends the response. Once the interaction is deferred this edits the
    /// deferred response instead.
    pub async fn reply(&self, message: ReplyMessage) -> Result<(), AckError> {
        let mut state = self.inner.state.lock().await;
        match *state {
            AckState::Pending => {
                self.inner.responder.reply(&message).await?;
                *state = AckState::Replied;
                Ok(())
            }
            AckState::Deferred { .. } => self.inner.responder.edit_reply(&message.content).await,
            AckState::Replied | AckState::ModalShown => Err(AckError::AlreadyAcknowledged),
        }
    }

    /// No-op once the interaction has been acknowledged.
    pub async fn defer_reply(&self, ephemeral: bool) -> Result<(), AckError> {
        let mut state = self.inner.state.lock().await;
        if *state != AckState::Pending {
            return Ok(());
        }
        self.inner.responder.defer_reply(ephemeral).await?;
        *state = AckState::Deferred { by_router: false };
        Ok(())
    }

    pub async fn show_modal(&self, modal: ModalSpec) -> Result<(), AckError> {
        let mut state = self.inner.state.lock().await;
        if *state != AckState::Pending {
            return Err(AckError::AlreadyAcknowledged);
        }
        self.inner.responder.show_modal(&modal).await?;
        *state = AckState::ModalShown;
        Ok(())
    }

    pub async fn edit_reply(&self, content: impl Into<String>) -> Result<(), AckError> {
        let state = self.inner.state.lock().await;
        match *state {
            AckState::Replied | AckState::Deferred { .. } => {
                self.inner.responder.edit_reply(&content.into()).await
            }
            AckState::Pending | AckState::ModalShown => Err(AckError::NotAcknowledged),
        }
    }

    pub async fn follow_up(&self, message: ReplyMessage) -> Result<(), AckError> {
        let state = self.inner.state.lock().await;
        if *state == AckState::Pending {
            return Err(AckError::NotAcknowledged);
        }
        self.inner.responder.follow_up(&message).await
    }

    /// Defers on the handler's behalf. Returns `false` when the interaction
    /// was already acknowledged.
    pub(crate) async fn fallback_defer(&self) -> Result<bool, AckError> {
        let mut state = self.inner.state.lock().await;
        if *state != AckState::Pending {
            return Ok(false);
        }
        self.inner.responder.defer_reply(false).await?;
        *state = AckState::Deferred { by_router: true };
        debug!("fallback deferral issued");
        Ok(true)
    }

    /// Best-effort failure notice in whatever form the current state allows.
    pub(crate) async fn report_failure(&self, content: &str) -> Result<(), AckError> {
        let mut state = self.inner.state.lock().await;
        match *state {
            AckState::Pending => {
                self.inner
                    .responder
                    .reply(&ReplyMessage::ephemeral(content))
                    .await?;
                *state = AckState::Replied;
                Ok(())
            }
            AckState::Deferred { .. } => self.inner.responder.edit_reply(content).await,
            AckState::Replied => {
                self.inner
                    .responder
                    .follow_up(&ReplyMessage::ephemeral(content))
                    .await
            }
            // A shown modal leaves no response to attach a notice to.
            AckState::ModalShown => Ok(()),
        }
    }
}
