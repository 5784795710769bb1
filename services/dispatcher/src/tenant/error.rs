use rusqlite::ErrorCode;
use thiserror::Error;

/// Failure reported by a [`ConfigStore`](super::ConfigStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store request timed out")]
    Timeout,
    #[error("invalid store response: {0}")]
    InvalidResponse(String),
    #[error("store returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store worker failed: {0}")]
    Worker(String),
    #[error("store connection poisoned")]
    Poisoned,
}

impl StoreError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(err) => matches!(
                err.sqlite_error_code(),
                Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            ),
            StoreError::Transport(_) | StoreError::Timeout => true,
            StoreError::Status { status, .. } => *status >= 500,
            StoreError::InvalidResponse(_)
            | StoreError::Serialization(_)
            | StoreError::Worker(_)
            | StoreError::Poisoned => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::InvalidResponse(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration store unavailable for tenant {tenant_id}: {source}")]
    StoreUnavailable {
        tenant_id: String,
        #[source]
        source: StoreError,
    },
    #[error("configuration store rejected request for tenant {tenant_id}: {source}")]
    StoreRejected {
        tenant_id: String,
        #[source]
        source: StoreError,
    },
    #[error("invalid tenant id '{0}'")]
    InvalidTenantId(String),
}

impl ConfigError {
    pub fn tenant_id(&self) -> &str {
        match self {
            ConfigError::StoreUnavailable { tenant_id, .. }
            | ConfigError::StoreRejected { tenant_id, .. }
            | ConfigError::InvalidTenantId(tenant_id) => tenant_id,
        }
    }
}
