//! Fixtures shared by the workspace benches and end-to-end tests.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use interaction_hub_dispatcher::{
    commands,
    config::DispatcherConfig,
    create_router,
    platform::{
        AckError, CommandPublisher, HttpCommandPublisher, InteractionResponder, ModalSpec,
        PlatformClient, ReplyMessage,
    },
    tenant::SqliteConfigStore,
    AccessLevelResolver, AppState, DispatchOutcome, DispatchRegistry, InteractionEnvelope,
    InteractionRouter, TenantConfigCache, TracingDiagnosticSink,
};
use interaction_hub_registry::{ContextKind, InteractionKind, Permission, PermissionSet};
use rand::Rng;
use reqwest::Client;
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use interaction_hub_dispatcher;
pub use interaction_hub_registry;
pub use serde_json;
pub use tracing_subscriber;

/// Responder that accepts every acknowledgment without doing I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResponder;

#[async_trait]
impl InteractionResponder for NullResponder {
    async fn reply(&self, _message: &ReplyMessage) -> Result<(), AckError> {
        Ok(())
    }

    async fn defer_reply(&self, _ephemeral: bool) -> Result<(), AckError> {
        Ok(())
    }

    async fn show_modal(&self, _modal: &ModalSpec) -> Result<(), AckError> {
        Ok(())
    }

    async fn edit_reply(&self, _content: &str) -> Result<(), AckError> {
        Ok(())
    }

    async fn follow_up(&self, _message: &ReplyMessage) -> Result<(), AckError> {
        Ok(())
    }
}

pub fn random_tenant_id(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{prefix}-{suffix:08x}")
}

/// Slash command envelope from an ordinary tenant member, with every bot
/// permission granted.
pub fn slash_envelope(interaction_id: &str, tenant_id: &str, identifier: &str) -> InteractionEnvelope {
    let mut parts = identifier.split(' ');
    let command_name = parts.next().unwrap_or_default().to_string();
    let (subcommand_group, subcommand) = match (parts.next(), parts.next()) {
        (Some(group), Some(sub)) => (Some(group.to_string()), Some(sub.to_string())),
        (Some(sub), None) => (None, Some(sub.to_string())),
        _ => (None, None),
    };
    let bot_permissions: PermissionSet = [Permission::ViewChannel, Permission::SendMessages]
        .into_iter()
        .collect();

    InteractionEnvelope {
        interaction_id: interaction_id.to_string(),
        token: format!("token-{interaction_id}"),
        interaction_kind: InteractionKind::SlashCommand,
        identifier_or_custom_id: identifier.to_string(),
        command_name,
        subcommand_group,
        subcommand,
        requester_id: "100000000000000001".to_string(),
        context_kind: ContextKind::Tenant,
        tenant_id: Some(tenant_id.to_string()),
        raw_options: Map::new(),
        channel_id: Some("200000000000000002".to_string()),
        target_id: None,
        member_role_ids: Vec::new(),
        member_permissions: PermissionSet::new(),
        bot_permissions: Some(bot_permissions),
        is_tenant_owner: false,
    }
}

/// In-process router over the built-in commands and an in-memory SQLite
/// store.
pub struct DispatchBenchFixture {
    pub router: Arc<InteractionRouter>,
    pub tenant_id: String,
}

impl DispatchBenchFixture {
    pub fn new(tenant_id: &str) -> Result<Self> {
        let table = commands::build_routing_table().context("failed to build routing table")?;
        let store = SqliteConfigStore::open_in_memory().context("failed to open store")?;
        let config = DispatcherConfig::default();
        let router = InteractionRouter::new(
            Arc::new(DispatchRegistry::new(table)),
            TenantConfigCache::new(Arc::new(store)),
            Arc::new(AccessLevelResolver::default()),
            Arc::new(TracingDiagnosticSink),
            config.router_settings(),
        );
        Ok(Self {
            router: Arc::new(router),
            tenant_id: tenant_id.to_string(),
        })
    }

    /// Adds `role_id` to the tenant's admin roles and warms the cache.
    pub async fn seed_admin_role(&self, role_id: &str) -> Result<()> {
        let role_id = role_id.to_string();
        self.router
            .tenants()
            .update(&self.tenant_id, move |settings| {
                settings.admin_role_ids.push(role_id)
            })
            .await
            .context("failed to seed admin role")?;
        Ok(())
    }

    pub fn envelope(&self, identifier: &str) -> InteractionEnvelope {
        slash_envelope("bench", &self.tenant_id, identifier)
    }

    pub fn with_option(mut envelope: InteractionEnvelope, name: &str, value: Value) -> InteractionEnvelope {
        envelope.raw_options.insert(name.to_string(), value);
        envelope
    }

    pub async fn dispatch(&self, envelope: InteractionEnvelope) -> DispatchOutcome {
        self.router.handle(envelope, Arc::new(NullResponder)).await
    }
}

/// Dispatcher served on an ephemeral local port, talking to the given
/// platform API base.
pub struct TestHarness {
    addr: SocketAddr,
    http_client: Client,
    router: Arc<InteractionRouter>,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

impl TestHarness {
    pub async fn start(platform_api_base: &str, admin_token: Option<&str>) -> Result<Self> {
        let config = DispatcherConfig {
            platform_api_base: platform_api_base.to_string(),
            platform_application_id: "app-e2e".to_string(),
            platform_bot_token: Some("bot-e2e".to_string()),
            admin_token: admin_token.map(str::to_string),
            ..DispatcherConfig::default()
        };

        let table = commands::build_routing_table().context("failed to build routing table")?;
        let registry = Arc::new(DispatchRegistry::new(table));
        let store = SqliteConfigStore::open_in_memory().context("failed to open store")?;
        let cache = TenantConfigCache::new(Arc::new(store)).with_retry_backoff(config.retry_backoff());
        let platform = PlatformClient::new(
            &config.platform_api_base,
            &config.platform_application_id,
            config.platform_timeout_secs,
        )?;
        let publisher: Arc<dyn CommandPublisher> = Arc::new(HttpCommandPublisher::new(
            &platform,
            &config.platform_application_id,
            config.platform_bot_token.as_deref().unwrap_or_default(),
        ));
        let router = Arc::new(InteractionRouter::new(
            registry,
            cache,
            Arc::new(AccessLevelResolver::new(config.operator_ids.clone())),
            Arc::new(TracingDiagnosticSink),
            config.router_settings(),
        ));

        let app = create_router(AppState {
            router: Arc::clone(&router),
            responders: Arc::new(platform),
            publisher: Some(publisher),
            registrar: commands::register_all,
            admin_token: config.admin_token.clone(),
        });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = result {
                tracing::error!(error = %err, "test dispatcher stopped with error");
            }
        });
        info!(%addr, "test dispatcher listening");

        Ok(Self {
            addr,
            http_client: Client::new(),
            router,
            shutdown: Some(shutdown_tx),
            server,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn router(&self) -> &Arc<InteractionRouter> {
        &self.router
    }

    pub async fn post_interaction(&self, envelope: &InteractionEnvelope) -> Result<reqwest::Response> {
        debug!(interaction_id = %envelope.interaction_id, "posting interaction");
        self.http_client
            .post(self.url("/v1/interactions"))
            .json(envelope)
            .send()
            .await
            .context("failed to post interaction")
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.server).await;
    }
}
