use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse authorization tier assigned to a requester.
///
/// Variants are declared in ascending order so the derived `Ord` matches the
/// tier ordering: `Everyone < TenantAdmin < Operator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Everyone,
    TenantAdmin,
    Operator,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 3] = [
        AccessLevel::Everyone,
        AccessLevel::TenantAdmin,
        AccessLevel::Operator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Everyone => "everyone",
            AccessLevel::TenantAdmin => "tenant_admin",
            AccessLevel::Operator => "operator",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AccessLevel::Everyone => "Everyone",
            AccessLevel::TenantAdmin => "Server Admin",
            AccessLevel::Operator => "Bot Operator",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversational context an interaction originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Tenant,
    Direct,
    GroupDirect,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Tenant => "tenant",
            ContextKind::Direct => "direct",
            ContextKind::GroupDirect => "group_direct",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context kinds in which a descriptor may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEnvironment {
    TenantOnly,
    DirectOnly,
    Both,
    Anywhere,
}

impl ExecutionEnvironment {
    pub fn allows(&self, context: ContextKind) -> bool {
        match self {
            ExecutionEnvironment::TenantOnly => context == ContextKind::Tenant,
            ExecutionEnvironment::DirectOnly => context == ContextKind::Direct,
            ExecutionEnvironment::Both => {
                matches!(context, ContextKind::Tenant | ContextKind::Direct)
            }
            ExecutionEnvironment::Anywhere => true,
        }
    }

    pub fn allows_direct(&self) -> bool {
        self.allows(ContextKind::Direct)
    }

    /// Human readable phrase used in denial explanations.
    pub fn describe(&self) -> &'static str {
        match self {
            ExecutionEnvironment::TenantOnly => "servers",
            ExecutionEnvironment::DirectOnly => "direct messages",
            ExecutionEnvironment::Both => "servers and direct messages",
            ExecutionEnvironment::Anywhere => "any conversation",
        }
    }
}

/// Capabilities held by the bot or by a member in a given context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Administrator,
    ManageGuild,
    ManageRoles,
    ManageChannels,
    ManageMessages,
    KickMembers,
    BanMembers,
    ModerateMembers,
    ViewChannel,
    SendMessages,
    EmbedLinks,
    AttachFiles,
    ReadMessageHistory,
    AddReactions,
    Connect,
    Speak,
}

impl Permission {
    pub fn display_name(&self) -> &'static str {
        match self {
            Permission::Administrator => "Administrator",
            Permission::ManageGuild => "Manage Server",
            Permission::ManageRoles => "Manage Roles",
            Permission::ManageChannels => "Manage Channels",
            Permission::ManageMessages => "Manage Messages",
            Permission::KickMembers => "Kick Members",
            Permission::BanMembers => "Ban Members",
            Permission::ModerateMembers => "Timeout Members",
            Permission::ViewChannel => "View Channel",
            Permission::SendMessages => "Send Messages",
            Permission::EmbedLinks => "Embed Links",
            Permission::AttachFiles => "Attach Files",
            Permission::ReadMessageHistory => "Read Message History",
            Permission::AddReactions => "Add Reactions",
            Permission::Connect => "Connect",
            Permission::Speak => "Speak",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

pub type PermissionSet = BTreeSet<Permission>;

/// Authorization requirements declared by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPolicy {
    pub allowed_execution_environment: ExecutionEnvironment,
    pub required_access_level: AccessLevel,
    #[serde(default)]
    pub required_bot_permissions: PermissionSet,
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self {
            allowed_execution_environment: ExecutionEnvironment::Anywhere,
            required_access_level: AccessLevel::Everyone,
            required_bot_permissions: PermissionSet::new(),
        }
    }
}

impl CommandPolicy {
    pub fn new(environment: ExecutionEnvironment, access_level: AccessLevel) -> Self {
        Self {
            allowed_execution_environment: environment,
            required_access_level: access_level,
            required_bot_permissions: PermissionSet::new(),
        }
    }

    pub fn with_bot_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        self.required_bot_permissions.extend(permissions);
        self
    }
}

/// Help/listing category of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    HelpAndInformation,
    FunStuff,
    Utilities,
    TenantAdmin,
    Operator,
}

impl Category {
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::HelpAndInformation => "Help And Information",
            Category::FunStuff => "Fun Stuff",
            Category::Utilities => "Utilities",
            Category::TenantAdmin => "Server Admin",
            Category::Operator => "Bot Operator",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Category::TenantAdmin => "Commands for server admins and bot operators.",
            Category::Operator => "Commands for bot operators.",
            _ => "Commands for everyone.",
        }
    }
}
