use std::collections::HashSet;

use interaction_hub_registry::{AccessLevel, ContextKind, Permission};

use crate::interaction::InteractionEnvelope;

/// Member permissions that make a requester a tenant admin on their own.
pub const ADMIN_CAPABILITIES: [Permission; 2] = [Permission::Administrator, Permission::ManageGuild];

/// Maps a requester to an [`AccessLevel`]. Pure: everything it needs is on
/// the envelope or passed in.
#[derive(Debug, Clone, Default)]
pub struct AccessLevelResolver {
    operators: HashSet<String>,
}

impl AccessLevelResolver {
    pub fn new<I, S>(operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operators: operators.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_operator(&self, requester_id: &str) -> bool {
        self.operators.contains(requester_id)
    }

    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }

    /// Administrative capability in the current tenant context, without
    /// consulting the tenant's configured admin roles.
    pub fn has_admin_capability(&self, envelope: &InteractionEnvelope) -> bool {
        envelope.context_kind == ContextKind::Tenant
            && (envelope.is_tenant_owner
                || ADMIN_CAPABILITIES
                    .iter()
                    .any(|p| envelope.member_permissions.contains(p)))
    }

    /// Whether resolving `envelope` against `required` could depend on the
    /// tenant's admin-role list.
    pub fn needs_tenant_roles(&self, envelope: &InteractionEnvelope, required: AccessLevel) -> bool {
        required >= AccessLevel::TenantAdmin
            && envelope.tenant().is_some()
            && !self.is_operator(&envelope.requester_id)
            && !self.has_admin_capability(envelope)
    }

    /// `tenant_admin_roles` is the tenant's configured admin-role list when
    /// it was loaded; `None` grants nothing.
    pub fn resolve(
        &self,
        envelope: &InteractionEnvelope,
        tenant_admin_roles: Option<&[String]>,
    ) -> AccessLevel {
        if self.is_operator(&envelope.requester_id) {
            return AccessLevel::Operator;
        }
        if envelope.context_kind != ContextKind::Tenant {
            return AccessLevel::Everyone;
        }
        if self.has_admin_capability(envelope) {
            return AccessLevel::TenantAdmin;
        }

        let holds_admin_role = tenant_admin_roles.is_some_and(|roles| {
            envelope
                .member_role_ids
                .iter()
                .any(|role| roles.contains(role))
        });
        if holds_admin_role {
            AccessLevel::TenantAdmin
        } else {
            AccessLevel::Everyone
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interaction_hub_registry::InteractionKind;

    fn envelope(context_kind: ContextKind) -> InteractionEnvelope {
        InteractionEnvelope {
            interaction_id: "i".into(),
            token: "t".into(),
            interaction_kind: InteractionKind::SlashCommand,
            identifier_or_custom_id: "settings".into(),
            command_name: "settings".into(),
            subcommand_group: None,
            subcommand: None,
            requester_id: "user".into(),
            context_kind,
            tenant_id: Some("g1".into()),
            raw_options: Default::default(),
            channel_id: None,
            target_id: None,
            member_role_ids: vec!["r1".into(), "r2".into()],
            member_permissions: Default::default(),
            bot_permissions: None,
            is_tenant_owner: false,
        }
    }

    #[test]
    fn operator_wins_regardless_of_roles() {
        let resolver = AccessLevelResolver::new(["user"]);
        let env = envelope(ContextKind::Direct);
        assert_eq!(resolver.resolve(&env, None), AccessLevel::Operator);
        let roles = vec!["r1".to_string()];
        assert_eq!(
            resolver.resolve(&envelope(ContextKind::Tenant), Some(roles.as_slice())),
            AccessLevel::Operator
        );
    }

    #[test]
    fn admin_role_grants_tenant_admin() {
        let resolver = AccessLevelResolver::default();
        let env = envelope(ContextKind::Tenant);
        let roles = vec!["r2".to_string()];
        assert_eq!(resolver.resolve(&env, Some(roles.as_slice())), AccessLevel::TenantAdmin);
        assert_eq!(resolver.resolve(&env, None), AccessLevel::Everyone);
        assert_eq!(
            resolver.resolve(&env, Some(&["other".to_string()][..])),
            AccessLevel::Everyone
        );
    }

    #[test]
    fn capability_and_ownership_grant_tenant_admin() {
        let resolver = AccessLevelResolver::default();
        let mut env = envelope(ContextKind::Tenant);
        env.member_permissions.insert(Permission::ManageGuild);
        assert_eq!(resolver.resolve(&env, None), AccessLevel::TenantAdmin);
        assert!(!resolver.needs_tenant_roles(&env, AccessLevel::TenantAdmin));

        let mut env = envelope(ContextKind::Tenant);
        env.is_tenant_owner = true;
        assert_eq!(resolver.resolve(&env, None), AccessLevel::TenantAdmin);
    }

    #[test]
    fn direct_context_only_reaches_operator() {
        let resolver = AccessLevelResolver::default();
        let mut env = envelope(ContextKind::Direct);
        env.member_permissions.insert(Permission::Administrator);
        let roles = vec!["r1".to_string()];
        assert_eq!(resolver.resolve(&env, Some(roles.as_slice())), AccessLevel::Everyone);
        assert!(!resolver.needs_tenant_roles(&env, AccessLevel::TenantAdmin));
    }

    #[test]
    fn tenant_roles_needed_only_above_everyone() {
        let resolver = AccessLevelResolver::default();
        let env = envelope(ContextKind::Tenant);
        assert!(resolver.needs_tenant_roles(&env, AccessLevel::TenantAdmin));
        assert!(!resolver.needs_tenant_roles(&env, AccessLevel::Everyone));
    }
}
