//! Fire-and-forget diagnostic records for events operators may want to see
//! but requesters never do.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    RoutingNotFound,
    HandlerFailure,
    AckDeadlineExceeded,
    AuthorizationDenied,
    Feedback,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::RoutingNotFound => "routing_not_found",
            DiagnosticKind::HandlerFailure => "handler_failure",
            DiagnosticKind::AckDeadlineExceeded => "ack_deadline_exceeded",
            DiagnosticKind::AuthorizationDenied => "authorization_denied",
            DiagnosticKind::Feedback => "feedback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub kind: DiagnosticKind,
    pub interaction_id: String,
    pub identifier: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl DiagnosticRecord {
    pub fn new(
        kind: DiagnosticKind,
        interaction_id: impl Into<String>,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            interaction_id: interaction_id.into(),
            identifier: identifier.into(),
            tenant_id: None,
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: Option<&str>) -> Self {
        self.tenant_id = tenant_id.map(str::to_string);
        self
    }
}

/// Must return promptly; implementations drop records rather than block.
pub trait DiagnosticSink: Send + Sync {
    fn append(&self, record: DiagnosticRecord);
}

/// Emits each record as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn append(&self, record: DiagnosticRecord) {
        let tenant = record.tenant_id.as_deref().unwrap_or("-");
        match record.kind {
            DiagnosticKind::HandlerFailure | DiagnosticKind::AckDeadlineExceeded => warn!(
                diagnostic = record.kind.as_str(),
                interaction_id = %record.interaction_id,
                identifier = %record.identifier,
                tenant = %tenant,
                message = %record.message,
                "diagnostic"
            ),
            _ => info!(
                diagnostic = record.kind.as_str(),
                interaction_id = %record.interaction_id,
                identifier = %record.identifier,
                tenant = %tenant,
                message = %record.message,
                "diagnostic"
            ),
        }
    }
}

/// Forwards records into a bounded channel, dropping them when it is full
/// or closed.
#[derive(Debug)]
pub struct ChannelDiagnosticSink {
    tx: mpsc::Sender<DiagnosticRecord>,
    dropped: AtomicU64,
}

impl ChannelDiagnosticSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DiagnosticRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl DiagnosticSink for ChannelDiagnosticSink {
    fn append(&self, record: DiagnosticRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) | Err(TrySendError::Closed(record)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    diagnostic = record.kind.as_str(),
                    interaction_id = %record.interaction_id,
                    dropped,
                    "diagnostic sink full, record dropped"
                );
            }
        }
    }
}
