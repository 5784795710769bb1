use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use interaction_hub_registry::{AccessLevel, CommandDescriptor, CommandRegistry, RegistryBuilder};
use serde_json::Value;
use tokio::time::Instant;

use crate::access::AccessLevelResolver;
use crate::diagnostics::{DiagnosticKind, DiagnosticRecord, DiagnosticSink};
use crate::interaction::InteractionEnvelope;
use crate::tenant::{TenantConfig, TenantConfigCache};

use super::ack::AckHandle;

/// Leaf logic behind a descriptor. Errors and panics are contained by the
/// router.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: HandlerContext) -> anyhow::Result<()>;
}

pub type SharedHandler = Arc<dyn CommandHandler>;
pub type Descriptor = CommandDescriptor<SharedHandler>;
pub type DispatchRegistry = CommandRegistry<SharedHandler>;
pub type DispatchRegistryBuilder = RegistryBuilder<SharedHandler>;

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: HandlerContext) -> anyhow::Result<()> {
        (self.0)(ctx).await
    }
}

/// Wraps an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Everything a handler sees for one interaction.
#[derive(Clone)]
pub struct HandlerContext {
    envelope: Arc<InteractionEnvelope>,
    ack: AckHandle,
    tenants: TenantConfigCache,
    access: Arc<AccessLevelResolver>,
    access_level: AccessLevel,
    diagnostics: Arc<dyn DiagnosticSink>,
    received_at: Instant,
}

impl HandlerContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        envelope: Arc<InteractionEnvelope>,
        ack: AckHandle,
        tenants: TenantConfigCache,
        access: Arc<AccessLevelResolver>,
        access_level: AccessLevel,
        diagnostics: Arc<dyn DiagnosticSink>,
        received_at: Instant,
    ) -> Self {
        Self {
            envelope,
            ack,
            tenants,
            access,
            access_level,
            diagnostics,
            received_at,
        }
    }

    pub fn envelope(&self) -> &InteractionEnvelope {
        &self.envelope
    }

    pub fn ack(&self) -> &AckHandle {
        &self.ack
    }

    pub fn tenants(&self) -> &TenantConfigCache {
        &self.tenants
    }

    /// Level the requester was authorized at. Tenant roles only count here
    /// when the descriptor's policy required them to be loaded.
    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    /// Time since the router received the interaction.
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.envelope.option(name)
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.envelope.option_str(name)
    }

    pub fn option_i64(&self, name: &str) -> Option<i64> {
        self.envelope.option_i64(name)
    }

    pub fn tenant_id(&self) -> anyhow::Result<&str> {
        self.envelope
            .tenant()
            .ok_or_else(|| anyhow!("interaction did not originate in a tenant"))
    }

    pub async fn tenant_config(&self) -> anyhow::Result<Arc<TenantConfig>> {
        let tenant_id = self.tenant_id()?;
        self.tenants
            .fetch(tenant_id)
            .await
            .with_context(|| format!("failed to load config for tenant {tenant_id}"))
    }

    /// Resolves the requester's level with the tenant's admin roles loaded,
    /// regardless of what authorization needed.
    pub async fn full_access_level(&self) -> anyhow::Result<AccessLevel> {
        let roles = match self.envelope.tenant() {
            Some(_) => Some(self.tenant_config().await?.settings.admin_role_ids.clone()),
            None => None,
        };
        Ok(self.access.resolve(&self.envelope, roles.as_deref()))
    }

    pub fn record(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.append(
            DiagnosticRecord::new(
                kind,
                &self.envelope.interaction_id,
                &self.envelope.identifier_or_custom_id,
                message,
            )
            .with_tenant(self.envelope.tenant()),
        );
    }
}
