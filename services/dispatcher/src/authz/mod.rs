use std::fmt;
use std::str::FromStr;

use interaction_hub_registry::{
    AccessLevel, CommandPolicy, ContextKind, ExecutionEnvironment, PermissionSet,
};
use serde::{Deserialize, Serialize};

use crate::interaction::InteractionEnvelope;
use crate::platform::ReplyMessage;

/// Why a descriptor may not run for this interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Denial {
    EnvironmentMismatch {
        allowed: ExecutionEnvironment,
        actual: ContextKind,
    },
    MissingBotPermission {
        missing: PermissionSet,
    },
    InsufficientUserAccess {
        required: AccessLevel,
        actual: AccessLevel,
    },
}

impl Denial {
    pub fn code(&self) -> &'static str {
        match self {
            Denial::EnvironmentMismatch { .. } => "environment_mismatch",
            Denial::MissingBotPermission { .. } => "missing_bot_permission",
            Denial::InsufficientUserAccess { .. } => "insufficient_user_access",
        }
    }

    /// Ephemeral explanation shown to the requester.
    pub fn explanation(&self) -> ReplyMessage {
        let content = match self {
            Denial::EnvironmentMismatch { allowed, .. } => format!(
                "**Invalid Execution Environment**\nThis command can only be executed in {}.",
                allowed.describe()
            ),
            Denial::MissingBotPermission { missing } => {
                let names: Vec<String> = missing.iter().map(|p| format!("- {p}")).collect();
                format!(
                    "**Missing Permissions**\nIn order to do that, I need you to grant me the following permission(s):\n>>> {}",
                    names.join("\n")
                )
            }
            Denial::InsufficientUserAccess { required, actual } => format!(
                "**Access Denied**\nYou aren't allowed to do that!\nRequired Access Level: {}\nYour Access Level: {}",
                required.display_name(),
                actual.display_name()
            ),
        };
        ReplyMessage::ephemeral(content)
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::EnvironmentMismatch { allowed, actual } => {
                write!(f, "{actual} context not allowed (requires {allowed:?})")
            }
            Denial::MissingBotPermission { missing } => {
                let names: Vec<&str> = missing.iter().map(|p| p.display_name()).collect();
                write!(f, "bot is missing permissions: {}", names.join(", "))
            }
            Denial::InsufficientUserAccess { required, actual } => {
                write!(f, "requires {required}, requester is {actual}")
            }
        }
    }
}

/// Whether denials also produce a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialAudit {
    #[default]
    Silent,
    Diagnostic,
}

impl FromStr for DenialAudit {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "silent" => Ok(DenialAudit::Silent),
            "diagnostic" => Ok(DenialAudit::Diagnostic),
            other => Err(format!("unknown denial audit policy '{other}'")),
        }
    }
}

/// Ordered checks: environment, then bot permissions, then the requester's
/// access level. The first failing check decides the denial.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationChain;

impl AuthorizationChain {
    pub fn new() -> Self {
        Self
    }

    /// The checks that depend only on the envelope.
    pub fn check_context(
        &self,
        policy: &CommandPolicy,
        envelope: &InteractionEnvelope,
    ) -> Result<(), Denial> {
        if !policy
            .allowed_execution_environment
            .allows(envelope.context_kind)
        {
            return Err(Denial::EnvironmentMismatch {
                allowed: policy.allowed_execution_environment,
                actual: envelope.context_kind,
            });
        }

        if !policy.required_bot_permissions.is_empty() {
            let granted = envelope.bot_permissions();
            let missing: PermissionSet = policy
                .required_bot_permissions
                .difference(&granted)
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(Denial::MissingBotPermission { missing });
            }
        }

        Ok(())
    }

    pub fn check_access(&self, policy: &CommandPolicy, actual: AccessLevel) -> Result<(), Denial> {
        if actual < policy.required_access_level {
            return Err(Denial::InsufficientUserAccess {
                required: policy.required_access_level,
                actual,
            });
        }
        Ok(())
    }

    /// Full chain for an already resolved access level.
    pub fn check(
        &self,
        policy: &CommandPolicy,
        envelope: &InteractionEnvelope,
        actual: AccessLevel,
    ) -> Result<(), Denial> {
        self.check_context(policy, envelope)?;
        self.check_access(policy, actual)
    }
}
