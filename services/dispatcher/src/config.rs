use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::authz::DenialAudit;
use crate::router::RouterSettings;
use crate::tenant::DEFAULT_RETRY_BACKOFF;

/// Platform-imposed acknowledgment deadline. The internal deadline must stay
/// strictly below it.
pub const PLATFORM_ACK_DEADLINE_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Sqlite,
    Http,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "http" => Ok(StoreBackend::Http),
            other => Err(anyhow!("unknown config store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub server_host: String,
    pub server_port: u16,
    pub platform_api_base: String,
    pub platform_application_id: String,
    #[serde(skip_serializing)]
    pub platform_bot_token: Option<String>,
    pub platform_timeout_secs: u64,
    pub operator_ids: Vec<String>,
    pub ack_deadline_ms: u64,
    pub config_lookup_timeout_ms: u64,
    pub store_backend: StoreBackend,
    pub store_path: PathBuf,
    pub store_url: Option<String>,
    pub store_timeout_secs: u64,
    pub store_retry_backoff_ms: u64,
    pub refresh_interval_secs: u64,
    pub denial_audit: DenialAudit,
    #[serde(skip_serializing)]
    pub admin_token: Option<String>,
    pub publish_on_startup: bool,
    pub log_level: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8282,
            platform_api_base: "https://discord.com/api/v10".to_string(),
            platform_application_id: String::new(),
            platform_bot_token: None,
            platform_timeout_secs: 10,
            operator_ids: Vec::new(),
            ack_deadline_ms: 2500,
            config_lookup_timeout_ms: 1000,
            store_backend: StoreBackend::Sqlite,
            store_path: Self::default_store_path(),
            store_url: None,
            store_timeout_secs: 5,
            store_retry_backoff_ms: DEFAULT_RETRY_BACKOFF.as_millis() as u64,
            refresh_interval_secs: 300,
            denial_audit: DenialAudit::Silent,
            admin_token: None,
            publish_on_startup: false,
            log_level: "info".to_string(),
        }
    }
}

impl DispatcherConfig {
    fn default_store_path() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("interaction-hub"))
            .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn from_env() -> Result<Self> {
        let mut config = DispatcherConfig::default();

        if let Some(host) = non_empty_var("DISPATCHER_HOST") {
            config.server_host = host;
        }

        if let Ok(port) = env::var("DISPATCHER_PORT") {
            config.server_port = port
                .parse::<u16>()
                .context("failed to parse DISPATCHER_PORT as u16")?;
        }

        if let Some(base) = non_empty_var("PLATFORM_API_BASE") {
            config.platform_api_base = base;
        }

        if let Some(app_id) = non_empty_var("PLATFORM_APPLICATION_ID") {
            config.platform_application_id = app_id;
        }

        config.platform_bot_token = non_empty_var("PLATFORM_BOT_TOKEN");

        if let Ok(timeout) = env::var("PLATFORM_TIMEOUT_SECS") {
            config.platform_timeout_secs = timeout
                .parse::<u64>()
                .context("failed to parse PLATFORM_TIMEOUT_SECS as u64")?;
        }

        if let Ok(ids) = env::var("OPERATOR_IDS") {
            config.operator_ids = parse_list(&ids);
        }

        if let Ok(deadline) = env::var("ACK_DEADLINE_MS") {
            config.ack_deadline_ms = deadline
                .parse::<u64>()
                .context("failed to parse ACK_DEADLINE_MS as u64")?;
        }

        if let Ok(timeout) = env::var("CONFIG_LOOKUP_TIMEOUT_MS") {
            config.config_lookup_timeout_ms = timeout
                .parse::<u64>()
                .context("failed to parse CONFIG_LOOKUP_TIMEOUT_MS as u64")?;
        }

        if let Some(backend) = non_empty_var("CONFIG_STORE_BACKEND") {
            config.store_backend = backend
                .parse()
                .context("failed to parse CONFIG_STORE_BACKEND")?;
        }

        if let Some(dir) = non_empty_var("CONFIG_STORE_PATH") {
            let path = PathBuf::from(&dir);
            config.store_path = if path.is_absolute() {
                path
            } else {
                env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(path)
            };
        }

        config.store_url = non_empty_var("CONFIG_STORE_URL");

        if let Ok(timeout) = env::var("CONFIG_STORE_TIMEOUT_SECS") {
            config.store_timeout_secs = timeout
                .parse::<u64>()
                .context("failed to parse CONFIG_STORE_TIMEOUT_SECS as u64")?;
        }

        if let Ok(backoff) = env::var("STORE_RETRY_BACKOFF_MS") {
            config.store_retry_backoff_ms = backoff
                .parse::<u64>()
                .context("failed to parse STORE_RETRY_BACKOFF_MS as u64")?;
        }

        if let Ok(interval) = env::var("CONFIG_REFRESH_INTERVAL_SECS") {
            config.refresh_interval_secs = interval
                .parse::<u64>()
                .context("failed to parse CONFIG_REFRESH_INTERVAL_SECS as u64")?;
        }

        if let Some(audit) = non_empty_var("DENIAL_AUDIT") {
            config.denial_audit = audit
                .parse::<DenialAudit>()
                .map_err(|err| anyhow!(err))
                .context("failed to parse DENIAL_AUDIT")?;
        }

        config.admin_token = non_empty_var("ADMIN_TOKEN");

        if let Ok(flag) = env::var("PUBLISH_COMMANDS_ON_STARTUP") {
            config.publish_on_startup = parse_bool(&flag)
                .context("failed to parse PUBLISH_COMMANDS_ON_STARTUP as bool")?;
        }

        if let Some(level) = non_empty_var("LOG_LEVEL") {
            config.log_level = level;
        }

        config.validate()?;

        info!(
            store_backend = ?config.store_backend,
            store_path = %config.store_path.display(),
            ack_deadline_ms = config.ack_deadline_ms,
            operators = config.operator_ids.len(),
            "Dispatcher configuration resolved"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ack_deadline_ms == 0 || self.ack_deadline_ms >= PLATFORM_ACK_DEADLINE_MS {
            bail!(
                "ACK_DEADLINE_MS must be between 1 and {} (got {})",
                PLATFORM_ACK_DEADLINE_MS - 1,
                self.ack_deadline_ms
            );
        }

        if self.config_lookup_timeout_ms == 0 || self.config_lookup_timeout_ms >= self.ack_deadline_ms {
            bail!(
                "CONFIG_LOOKUP_TIMEOUT_MS must be between 1 and ACK_DEADLINE_MS (got {})",
                self.config_lookup_timeout_ms
            );
        }

        if self.store_backend == StoreBackend::Http && self.store_url.is_none() {
            bail!("CONFIG_STORE_URL is required when CONFIG_STORE_BACKEND is http");
        }

        if self.publish_on_startup
            && (self.platform_application_id.is_empty() || self.platform_bot_token.is_none())
        {
            bail!("publishing commands requires PLATFORM_APPLICATION_ID and PLATFORM_BOT_TOKEN");
        }

        Ok(())
    }

    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            ack_deadline: Duration::from_millis(self.ack_deadline_ms),
            config_lookup_timeout: Duration::from_millis(self.config_lookup_timeout_ms),
            denial_audit: self.denial_audit,
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.store_retry_backoff_ms)
    }

    /// `None` when periodic refresh is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(value: &str) -> Result<bool> {
    value.parse::<bool>().or_else(|_| match value {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(anyhow!("invalid boolean value: {}", other)),
    })
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
