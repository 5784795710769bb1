mod cache;
mod error;
mod http;
mod schema;
mod settings;
mod sqlite;
mod store;

pub use cache::{
    validate_tenant_id, RefreshReport, RefreshTask, TenantConfigCache, DEFAULT_RETRY_BACKOFF,
};
pub use error::{ConfigError, StoreError};
pub use http::HttpConfigStore;
pub use schema::{TENANT_CONFIGS_DB_FILENAME, TENANT_CONFIGS_SCHEMA};
pub use settings::{next_modified_at, AiChatMode, FeatureValue, TenantConfig, TenantSettings};
pub use sqlite::SqliteConfigStore;
pub use store::ConfigStore;
