//! Shared fixtures for the dispatcher integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use interaction_hub_dispatcher::{
    platform::{
        AckError, InteractionResponder, ModalSpec, ReplyMessage, ResponderFactory,
    },
    router::DispatchRegistryBuilder,
    tenant::{ConfigStore, StoreError, TenantConfig, TenantConfigCache},
    AccessLevelResolver, DiagnosticKind, DiagnosticRecord, DiagnosticSink, DispatchRegistry,
    InteractionEnvelope, InteractionRouter, RouterSettings,
};
use interaction_hub_registry::{ContextKind, InteractionKind, Permission, PermissionSet};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Transient,
    Permanent,
}

impl Failure {
    fn error(self) -> StoreError {
        match self {
            Failure::Transient => StoreError::Transport("connection reset".to_string()),
            Failure::Permanent => StoreError::Status {
                status: 400,
                message: "bad request".to_string(),
            },
        }
    }
}

/// In-memory [`ConfigStore`] that counts calls and injects latency and
/// failures.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, TenantConfig>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    latency: Mutex<Duration>,
    failure: Mutex<Option<Failure>>,
    failing_tenants: Mutex<HashSet<String>>,
    slow_tenants: Mutex<HashMap<String, Duration>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Every call fails with `failure` until cleared with `None`.
    pub fn set_failure(&self, failure: Option<Failure>) {
        *self.failure.lock().unwrap() = failure;
    }

    /// Calls for this tenant fail transiently.
    pub fn fail_tenant(&self, tenant_id: &str) {
        self.failing_tenants
            .lock()
            .unwrap()
            .insert(tenant_id.to_string());
    }

    /// Calls for this tenant take `latency` on top of the global latency.
    pub fn slow_tenant(&self, tenant_id: &str, latency: Duration) {
        self.slow_tenants
            .lock()
            .unwrap()
            .insert(tenant_id.to_string(), latency);
    }

    pub fn insert(&self, record: TenantConfig) {
        self.records
            .lock()
            .unwrap()
            .insert(record.tenant_id.clone(), record);
    }

    pub fn remove(&self, tenant_id: &str) {
        self.records.lock().unwrap().remove(tenant_id);
    }

    pub fn record(&self, tenant_id: &str) -> Option<TenantConfig> {
        self.records.lock().unwrap().get(tenant_id).cloned()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    async fn before_call(&self, tenant_id: &str) -> Result<(), StoreError> {
        let extra = self
            .slow_tenants
            .lock()
            .unwrap()
            .get(tenant_id)
            .copied()
            .unwrap_or_default();
        let latency = *self.latency.lock().unwrap() + extra;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(failure) = *self.failure.lock().unwrap() {
            return Err(failure.error());
        }
        if self.failing_tenants.lock().unwrap().contains(tenant_id) {
            return Err(Failure::Transient.error());
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get(&self, tenant_id: &str) -> Result<Option<TenantConfig>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.before_call(tenant_id).await?;
        Ok(self.record(tenant_id))
    }

    async fn put(&self, tenant_id: &str, record: &TenantConfig) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.before_call(tenant_id).await?;
        self.records
            .lock()
            .unwrap()
            .insert(tenant_id.to_string(), record.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Reply { content: String, ephemeral: bool },
    Defer { ephemeral: bool },
    Modal(String),
    Edit(String),
    FollowUp { content: String, ephemeral: bool },
}

#[derive(Default)]
pub struct RecordingResponder {
    calls: Mutex<Vec<Call>>,
}

impl RecordingResponder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl InteractionResponder for RecordingResponder {
    async fn reply(&self, message: &ReplyMessage) -> Result<(), AckError> {
        self.push(Call::Reply {
            content: message.content.clone(),
            ephemeral: message.ephemeral,
        });
        Ok(())
    }

    async fn defer_reply(&self, ephemeral: bool) -> Result<(), AckError> {
        self.push(Call::Defer { ephemeral });
        Ok(())
    }

    async fn show_modal(&self, modal: &ModalSpec) -> Result<(), AckError> {
        self.push(Call::Modal(modal.custom_id.clone()));
        Ok(())
    }

    async fn edit_reply(&self, content: &str) -> Result<(), AckError> {
        self.push(Call::Edit(content.to_string()));
        Ok(())
    }

    async fn follow_up(&self, message: &ReplyMessage) -> Result<(), AckError> {
        self.push(Call::FollowUp {
            content: message.content.clone(),
            ephemeral: message.ephemeral,
        });
        Ok(())
    }
}

/// Hands every interaction the same recording responder.
pub struct FixedResponders(pub Arc<RecordingResponder>);

impl ResponderFactory for FixedResponders {
    fn responder(&self, _envelope: &InteractionEnvelope) -> Arc<dyn InteractionResponder> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct CollectingSink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.records().into_iter().map(|record| record.kind).collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn append(&self, record: DiagnosticRecord) {
        self.records.lock().unwrap().push(record);
    }
}

pub const TENANT: &str = "tenant_123";
pub const REQUESTER: &str = "1001";

pub fn all_bot_permissions() -> PermissionSet {
    [
        Permission::ViewChannel,
        Permission::SendMessages,
        Permission::EmbedLinks,
        Permission::ManageRoles,
    ]
    .into_iter()
    .collect()
}

/// Tenant-context envelope from an ordinary member.
pub fn envelope(kind: InteractionKind, identifier: &str) -> InteractionEnvelope {
    let (command_name, subcommand_group, subcommand) = match kind {
        InteractionKind::Component | InteractionKind::Modal => (String::new(), None, None),
        // Context menu names are display names and may contain spaces.
        InteractionKind::UserContext | InteractionKind::MessageContext => {
            (identifier.to_string(), None, None)
        }
        InteractionKind::SlashCommand => {
            let mut parts = identifier.split(' ');
            let command = parts.next().unwrap_or_default().to_string();
            let (group, sub) = match (parts.next(), parts.next()) {
                (Some(group), Some(sub)) => (Some(group.to_string()), Some(sub.to_string())),
                (Some(sub), None) => (None, Some(sub.to_string())),
                _ => (None, None),
            };
            (command, group, sub)
        }
    };

    InteractionEnvelope {
        interaction_id: format!("ix-{}", identifier.replace(' ', "-")),
        token: "token".to_string(),
        interaction_kind: kind,
        identifier_or_custom_id: identifier.to_string(),
        command_name,
        subcommand_group,
        subcommand,
        requester_id: REQUESTER.to_string(),
        context_kind: ContextKind::Tenant,
        tenant_id: Some(TENANT.to_string()),
        raw_options: Map::new(),
        channel_id: Some("2002".to_string()),
        target_id: None,
        member_role_ids: Vec::new(),
        member_permissions: PermissionSet::new(),
        bot_permissions: Some(all_bot_permissions()),
        is_tenant_owner: false,
    }
}

pub fn slash(identifier: &str) -> InteractionEnvelope {
    envelope(InteractionKind::SlashCommand, identifier)
}

pub fn with_option(mut envelope: InteractionEnvelope, name: &str, value: Value) -> InteractionEnvelope {
    envelope.raw_options.insert(name.to_string(), value);
    envelope
}

pub struct Harness {
    pub router: Arc<InteractionRouter>,
    pub store: Arc<MemoryStore>,
    pub cache: TenantConfigCache,
    pub sink: Arc<CollectingSink>,
}

pub fn harness<F>(populate: F, settings: RouterSettings, operators: &[&str]) -> Harness
where
    F: FnOnce(&mut DispatchRegistryBuilder),
{
    let mut builder = DispatchRegistryBuilder::new();
    populate(&mut builder);
    let registry = Arc::new(DispatchRegistry::new(builder.build()));

    let store = MemoryStore::new();
    let cache = TenantConfigCache::new(store.clone()).with_retry_backoff(Duration::from_millis(10));
    let sink = CollectingSink::new();
    let router = Arc::new(InteractionRouter::new(
        registry,
        cache.clone(),
        Arc::new(AccessLevelResolver::new(operators.iter().copied())),
        sink.clone(),
        settings,
    ));

    Harness {
        router,
        store,
        cache,
        sink,
    }
}
