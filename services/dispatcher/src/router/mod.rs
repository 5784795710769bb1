//! Interaction pipeline: resolve, authorize, execute, and guarantee an
//! acknowledgment before the platform's response deadline.

mod ack;
mod handler;

use std::sync::Arc;
use std::time::Duration;

use interaction_hub_registry::{
    AccessLevel, InteractionKind, RouteNotFound, RoutingPath, RoutingTable,
};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, instrument, warn};

use crate::access::AccessLevelResolver;
use crate::authz::{AuthorizationChain, Denial, DenialAudit};
use crate::diagnostics::{DiagnosticKind, DiagnosticRecord, DiagnosticSink};
use crate::interaction::InteractionEnvelope;
use crate::platform::InteractionResponder;
use crate::tenant::TenantConfigCache;

pub use ack::{AckHandle, AckSource, AckState};
pub use handler::{
    handler_fn, CommandHandler, Descriptor, DispatchRegistry, DispatchRegistryBuilder,
    HandlerContext, SharedHandler,
};

pub const DEFAULT_ACK_DEADLINE: Duration = Duration::from_millis(2500);
pub const DEFAULT_CONFIG_LOOKUP_TIMEOUT: Duration = Duration::from_millis(1000);

const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while running this command. Please try again later.";

/// Resolves a fallback deferral so the requester is not left waiting.
pub const NO_RESPONSE_MESSAGE: &str = "This command finished without a response.";

#[derive(Debug, Clone, Copy)]
pub struct RouterSettings {
    /// Internal acknowledgment deadline, kept below the platform's 3 s.
    pub ack_deadline: Duration,
    /// Bound on loading tenant admin roles during authorization.
    pub config_lookup_timeout: Duration,
    pub denial_audit: DenialAudit,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            ack_deadline: DEFAULT_ACK_DEADLINE,
            config_lookup_timeout: DEFAULT_CONFIG_LOOKUP_TIMEOUT,
            denial_audit: DenialAudit::Silent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Completed { ack: AckSource },
    Denied(Denial),
    NotFound,
    HandlerFailed,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Completed { .. } => "completed",
            DispatchOutcome::Denied(_) => "denied",
            DispatchOutcome::NotFound => "not_found",
            DispatchOutcome::HandlerFailed => "handler_failed",
        }
    }
}

pub struct InteractionRouter {
    registry: Arc<DispatchRegistry>,
    tenants: TenantConfigCache,
    access: Arc<AccessLevelResolver>,
    authz: AuthorizationChain,
    diagnostics: Arc<dyn DiagnosticSink>,
    settings: RouterSettings,
}

impl InteractionRouter {
    pub fn new(
        registry: Arc<DispatchRegistry>,
        tenants: TenantConfigCache,
        access: Arc<AccessLevelResolver>,
        diagnostics: Arc<dyn DiagnosticSink>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            registry,
            tenants,
            access,
            authz: AuthorizationChain::new(),
            diagnostics,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<DispatchRegistry> {
        &self.registry
    }

    pub fn tenants(&self) -> &TenantConfigCache {
        &self.tenants
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Runs [`handle`](Self::handle) as an independent task.
    pub fn dispatch(
        self: &Arc<Self>,
        envelope: InteractionEnvelope,
        responder: Arc<dyn InteractionResponder>,
    ) -> JoinHandle<DispatchOutcome> {
        let router = Arc::clone(self);
        tokio::spawn(async move { router.handle(envelope, responder).await })
    }

    #[instrument(
        skip(self, envelope, responder),
        fields(interaction_id = %envelope.interaction_id, kind = %envelope.interaction_kind)
    )]
    pub async fn handle(
        &self,
        envelope: InteractionEnvelope,
        responder: Arc<dyn InteractionResponder>,
    ) -> DispatchOutcome {
        let received_at = Instant::now();
        let envelope = Arc::new(envelope);
        debug!(
            interaction_id = %envelope.interaction_id,
            identifier = %envelope.identifier_or_custom_id,
            "received"
        );

        let table = self.registry.snapshot();
        debug!(interaction_id = %envelope.interaction_id, generation = table.generation(), "resolving");
        let descriptor = match resolve(&table, &envelope) {
            Ok(descriptor) => descriptor,
            Err(not_found) => {
                debug!(interaction_id = %envelope.interaction_id, %not_found, "no route, dropping");
                self.record(&envelope, DiagnosticKind::RoutingNotFound, not_found.to_string());
                return DispatchOutcome::NotFound;
            }
        };

        debug!(interaction_id = %envelope.interaction_id, "authorizing");
        let ack = AckHandle::new(responder);
        let access_level = match self.authorize(&descriptor, &envelope).await {
            Ok(level) => level,
            Err(denial) => {
                self.deny(&envelope, &ack, &denial).await;
                return DispatchOutcome::Denied(denial);
            }
        };

        debug!(interaction_id = %envelope.interaction_id, %access_level, "executing");
        let handler = Arc::clone(descriptor.handler());
        let ctx = HandlerContext::new(
            Arc::clone(&envelope),
            ack.clone(),
            self.tenants.clone(),
            Arc::clone(&self.access),
            access_level,
            Arc::clone(&self.diagnostics),
            received_at,
        );
        let mut task = tokio::spawn(async move { handler.handle(ctx).await });

        let before_deadline = tokio::select! {
            joined = &mut task => Some(joined),
            _ = sleep_until(received_at + self.settings.ack_deadline) => None,
        };
        // The handler keeps running past the deadline; it is never cancelled.
        let joined = match before_deadline {
            Some(joined) => joined,
            None => {
                self.deadline_elapsed(&envelope, &ack).await;
                task.await
            }
        };

        match joined {
            Ok(Ok(())) => {
                match ack.fallback_defer().await {
                    Ok(true) => {
                        warn!(
                            interaction_id = %envelope.interaction_id,
                            "handler returned without acknowledging, deferred on its behalf"
                        );
                        if let Err(err) = ack.edit_reply(NO_RESPONSE_MESSAGE).await {
                            warn!(
                                interaction_id = %envelope.interaction_id,
                                error = %err,
                                "failed to resolve fallback deferral"
                            );
                        }
                    }
                    Ok(false) => {}
                    Err(err) => warn!(
                        interaction_id = %envelope.interaction_id,
                        error = %err,
                        "fallback deferral failed"
                    ),
                }
                let source = ack.source().await.unwrap_or(AckSource::Fallback);
                debug!(interaction_id = %envelope.interaction_id, ack = ?source, "acknowledged");
                DispatchOutcome::Completed { ack: source }
            }
            Ok(Err(err)) => self.fail(&envelope, &ack, format!("{err:#}")).await,
            Err(join_err) if join_err.is_panic() => {
                self.fail(&envelope, &ack, "handler panicked".to_string()).await
            }
            Err(join_err) => self.fail(&envelope, &ack, join_err.to_string()).await,
        }
    }

    async fn authorize(
        &self,
        descriptor: &Descriptor,
        envelope: &InteractionEnvelope,
    ) -> Result<AccessLevel, Denial> {
        let policy = descriptor.policy();
        self.authz.check_context(policy, envelope)?;

        let roles = if self
            .access
            .needs_tenant_roles(envelope, policy.required_access_level)
        {
            self.tenant_admin_roles(envelope).await
        } else {
            None
        };
        let level = self.access.resolve(envelope, roles.as_deref());
        self.authz.check_access(policy, level)?;
        Ok(level)
    }

    /// Admin roles for the envelope's tenant, or `None` when the store does
    /// not answer in time.
    async fn tenant_admin_roles(&self, envelope: &InteractionEnvelope) -> Option<Vec<String>> {
        let tenant_id = envelope.tenant()?;
        match timeout(self.settings.config_lookup_timeout, self.tenants.fetch(tenant_id)).await {
            Ok(Ok(config)) => Some(config.settings.admin_role_ids.clone()),
            Ok(Err(err)) => {
                warn!(tenant = %tenant_id, error = %err, "tenant config unavailable, ignoring admin roles");
                None
            }
            Err(_) => {
                warn!(
                    tenant = %tenant_id,
                    timeout_ms = self.settings.config_lookup_timeout.as_millis() as u64,
                    "tenant config lookup timed out, ignoring admin roles"
                );
                None
            }
        }
    }

    async fn deny(&self, envelope: &InteractionEnvelope, ack: &AckHandle, denial: &Denial) {
        debug!(
            interaction_id = %envelope.interaction_id,
            reason = denial.code(),
            %denial,
            "denied"
        );
        if self.settings.denial_audit == DenialAudit::Diagnostic {
            self.record(envelope, DiagnosticKind::AuthorizationDenied, denial.to_string());
        }
        if let Err(err) = ack.reply(denial.explanation()).await {
            warn!(interaction_id = %envelope.interaction_id, error = %err, "failed to deliver denial");
        }
    }

    async fn deadline_elapsed(&self, envelope: &InteractionEnvelope, ack: &AckHandle) {
        match ack.fallback_defer().await {
            Ok(true) => {
                warn!(
                    interaction_id = %envelope.interaction_id,
                    deadline_ms = self.settings.ack_deadline.as_millis() as u64,
                    "handler missed acknowledgment deadline, deferred on its behalf"
                );
                self.record(
                    envelope,
                    DiagnosticKind::AckDeadlineExceeded,
                    format!(
                        "no acknowledgment within {} ms",
                        self.settings.ack_deadline.as_millis()
                    ),
                );
            }
            Ok(false) => {}
            Err(err) => warn!(
                interaction_id = %envelope.interaction_id,
                error = %err,
                "fallback deferral failed"
            ),
        }
    }

    async fn fail(
        &self,
        envelope: &InteractionEnvelope,
        ack: &AckHandle,
        message: String,
    ) -> DispatchOutcome {
        error!(
            interaction_id = %envelope.interaction_id,
            identifier = %envelope.identifier_or_custom_id,
            error = %message,
            "handler failed"
        );
        self.record(envelope, DiagnosticKind::HandlerFailure, message);
        if let Err(err) = ack.report_failure(GENERIC_FAILURE_MESSAGE).await {
            warn!(interaction_id = %envelope.interaction_id, error = %err, "failed to report handler failure");
        }
        DispatchOutcome::HandlerFailed
    }

    fn record(&self, envelope: &InteractionEnvelope, kind: DiagnosticKind, message: String) {
        self.diagnostics.append(
            DiagnosticRecord::new(
                kind,
                &envelope.interaction_id,
                &envelope.identifier_or_custom_id,
                message,
            )
            .with_tenant(envelope.tenant()),
        );
    }
}

fn resolve(
    table: &RoutingTable<SharedHandler>,
    envelope: &InteractionEnvelope,
) -> Result<Arc<Descriptor>, RouteNotFound> {
    let kind = envelope.interaction_kind;
    match kind {
        InteractionKind::SlashCommand => match envelope.routing_path() {
            Some(path) => table.resolve(&path, kind),
            None => Err(RouteNotFound {
                kind,
                identifier: envelope.identifier_or_custom_id.clone(),
            }),
        },
        InteractionKind::UserContext | InteractionKind::MessageContext => {
            table.resolve(&RoutingPath::command(envelope.context_menu_name()), kind)
        }
        InteractionKind::Component | InteractionKind::Modal => {
            table.resolve_custom_id(&envelope.identifier_or_custom_id, kind)
        }
    }
}
