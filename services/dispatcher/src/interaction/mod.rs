use interaction_hub_registry::{ContextKind, InteractionKind, PermissionSet, RoutingPath};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound interaction as delivered by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEnvelope {
    pub interaction_id: String,
    pub token: String,
    pub interaction_kind: InteractionKind,
    pub identifier_or_custom_id: String,
    #[serde(default)]
    pub command_name: String,
    #[serde(default)]
    pub subcommand_group: Option<String>,
    #[serde(default)]
    pub subcommand: Option<String>,
    pub requester_id: String,
    pub context_kind: ContextKind,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub raw_options: Map<String, Value>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub member_role_ids: Vec<String>,
    #[serde(default)]
    pub member_permissions: PermissionSet,
    /// Absent when the gateway could not resolve the bot's permissions;
    /// treated as an empty set.
    #[serde(default)]
    pub bot_permissions: Option<PermissionSet>,
    #[serde(default)]
    pub is_tenant_owner: bool,
}

impl InteractionEnvelope {
    /// Path used for slash command resolution. `None` for a group without a
    /// subcommand.
    pub fn routing_path(&self) -> Option<RoutingPath> {
        let command = if self.command_name.is_empty() {
            self.identifier_or_custom_id
                .split_whitespace()
                .next()
                .unwrap_or_default()
        } else {
            self.command_name.as_str()
        };
        RoutingPath::from_parts(
            command,
            self.subcommand_group.clone(),
            self.subcommand.clone(),
        )
    }

    /// Full display name of an invoked context menu. Unlike slash commands
    /// the name may contain spaces, so it is never split.
    pub fn context_menu_name(&self) -> &str {
        if self.command_name.is_empty() {
            self.identifier_or_custom_id.trim()
        } else {
            self.command_name.as_str()
        }
    }

    /// Tenant id of a tenant-context interaction.
    pub fn tenant(&self) -> Option<&str> {
        match self.context_kind {
            ContextKind::Tenant => self.tenant_id.as_deref(),
            _ => None,
        }
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.raw_options.get(name)
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    /// Integer option. Numeric strings are accepted as well.
    pub fn option_i64(&self, name: &str) -> Option<i64> {
        match self.option(name)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn option_bool(&self, name: &str) -> Option<bool> {
        self.option(name).and_then(Value::as_bool)
    }

    pub fn bot_permissions(&self) -> PermissionSet {
        self.bot_permissions.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> InteractionEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn minimal_envelope_deserializes_with_defaults() {
        let env = envelope(json!({
            "interaction_id": "1",
            "token": "t",
            "interaction_kind": "slash_command",
            "identifier_or_custom_id": "settings ai_chat mode",
            "command_name": "settings",
            "subcommand_group": "ai_chat",
            "subcommand": "mode",
            "requester_id": "42",
            "context_kind": "group_direct"
        }));

        assert_eq!(env.interaction_kind, InteractionKind::SlashCommand);
        assert!(env.bot_permissions.is_none());
        assert!(env.bot_permissions().is_empty());
        assert!(env.tenant().is_none());
        assert_eq!(
            env.routing_path().unwrap(),
            RoutingPath::grouped("settings", "ai_chat", "mode")
        );
    }

    #[test]
    fn options_are_read_loosely() {
        let env = envelope(json!({
            "interaction_id": "1",
            "token": "t",
            "interaction_kind": "slash_command",
            "identifier_or_custom_id": "roll",
            "requester_id": "42",
            "context_kind": "tenant",
            "tenant_id": "g1",
            "raw_options": {"amount": 3, "sides": "20", "role": "99"}
        }));

        assert_eq!(env.option_i64("amount"), Some(3));
        assert_eq!(env.option_i64("sides"), Some(20));
        assert_eq!(env.option_str("role"), Some("99"));
        assert_eq!(env.tenant(), Some("g1"));
        assert_eq!(env.routing_path().unwrap(), RoutingPath::command("roll"));
    }

    #[test]
    fn context_menu_name_keeps_spaces() {
        let env = envelope(json!({
            "interaction_id": "1",
            "token": "t",
            "interaction_kind": "user_context",
            "identifier_or_custom_id": "Quick User Info",
            "requester_id": "42",
            "context_kind": "tenant",
            "tenant_id": "g1",
            "target_id": "77"
        }));

        assert_eq!(env.context_menu_name(), "Quick User Info");
    }
}
