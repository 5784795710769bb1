use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use super::error::StoreError;
use super::settings::TenantConfig;
use super::store::ConfigStore;

/// Remote configuration service client.
pub struct HttpConfigStore {
    http_client: Client,
    base_url: String,
}

impl HttpConfigStore {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn config_url(&self, tenant_id: &str) -> String {
        format!("{}/v1/tenants/{}/config", self.base_url, tenant_id)
    }
}

async fn status_error(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unreadable response body".to_string());
    StoreError::Status { status, message }
}

#[async_trait]
impl ConfigStore for HttpConfigStore {
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    async fn get(&self, tenant_id: &str) -> Result<Option<TenantConfig>, StoreError> {
        let response = self
            .http_client
            .get(self.config_url(tenant_id))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("no stored config");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.json::<TenantConfig>().await?)),
            _ => Err(status_error(response).await),
        }
    }

    #[instrument(skip(self, record), fields(tenant_id = %tenant_id))]
    async fn put(&self, tenant_id: &str, record: &TenantConfig) -> Result<(), StoreError> {
        let response = self
            .http_client
            .put(self.config_url(tenant_id))
            .json(record)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    fn backend(&self) -> &'static str {
        "http"
    }
}
