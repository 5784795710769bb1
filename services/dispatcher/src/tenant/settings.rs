use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiChatMode {
    #[default]
    Disabled,
    RequireMention,
    AlwaysRespond,
}

impl AiChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiChatMode::Disabled => "disabled",
            AiChatMode::RequireMention => "require_mention",
            AiChatMode::AlwaysRespond => "always_respond",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "disabled" => Some(AiChatMode::Disabled),
            "require_mention" => Some(AiChatMode::RequireMention),
            "always_respond" => Some(AiChatMode::AlwaysRespond),
            _ => None,
        }
    }
}

/// Value of an entry in the typed feature extension map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Flag(bool),
    Integer(i64),
    Text(String),
    List(Vec<String>),
}

/// Per-tenant settings. Every field defaults so partially populated stored
/// records still load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TenantSettings {
    #[serde(default)]
    pub admin_role_ids: Vec<String>,
    #[serde(default)]
    pub ai_chat_mode: AiChatMode,
    #[serde(default)]
    pub ai_chat_channel_ids: Vec<String>,
    #[serde(default)]
    pub features: BTreeMap<String, FeatureValue>,
}

impl TenantSettings {
    pub fn feature(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    pub fn feature_enabled(&self, name: &str) -> bool {
        matches!(self.features.get(name), Some(FeatureValue::Flag(true)))
    }
}

/// A tenant's configuration record, as cached and as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: String,
    #[serde(default)]
    pub settings: TenantSettings,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_modified_at: DateTime<Utc>,
}

impl TenantConfig {
    /// Default record synthesized for a tenant the store has never seen.
    pub fn new_default(tenant_id: &str) -> Self {
        let now = Utc::now();
        Self {
            tenant_id: tenant_id.to_string(),
            settings: TenantSettings::default(),
            created_at: now,
            last_modified_at: now,
        }
    }
}

/// Next modification timestamp: wall clock, but never at or before the
/// previous one.
pub fn next_modified_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    Utc::now().max(floor)
}
