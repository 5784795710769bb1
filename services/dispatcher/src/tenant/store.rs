use async_trait::async_trait;

use super::error::StoreError;
use super::settings::TenantConfig;

/// Backing store holding one configuration record per tenant.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when the store has no record for the tenant.
    async fn get(&self, tenant_id: &str) -> Result<Option<TenantConfig>, StoreError>;

    /// Creates or replaces the tenant's record.
    async fn put(&self, tenant_id: &str, record: &TenantConfig) -> Result<(), StoreError>;

    fn backend(&self) -> &'static str;
}
