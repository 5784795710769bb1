use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use super::error::{ConfigError, StoreError};
use super::settings::{next_modified_at, TenantConfig, TenantSettings};
use super::store::ConfigStore;

pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(200);
const DEFAULT_REFRESH_CONCURRENCY: usize = 8;
const MAX_TENANT_ID_LEN: usize = 64;

/// One tenant's cached entry. `current` is only ever held for a pointer
/// copy; `io` is held across store round trips so loads and writes for the
/// tenant are serialized.
#[derive(Default)]
struct TenantSlot {
    current: RwLock<Option<Arc<TenantConfig>>>,
    io: Mutex<()>,
}

impl TenantSlot {
    fn load(&self) -> Option<Arc<TenantConfig>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, config: Arc<TenantConfig>) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(config);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    Unchanged,
    Missing,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub unchanged: usize,
    /// Tenants whose record vanished from the store; they keep their cached
    /// entry.
    pub missing: usize,
    pub failed: usize,
    pub failed_tenants: Vec<String>,
}

/// Per-tenant configuration cache with create-on-miss and single-writer
/// updates. Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct TenantConfigCache {
    slots: Arc<DashMap<String, Arc<TenantSlot>>>,
    store: Arc<dyn ConfigStore>,
    retry_backoff: Duration,
    refresh_concurrency: usize,
}

impl TenantConfigCache {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            store,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            refresh_concurrency: DEFAULT_REFRESH_CONCURRENCY,
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_refresh_concurrency(mut self, limit: usize) -> Self {
        self.refresh_concurrency = limit.max(1);
        self
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Cached entry only; never touches the store.
    pub fn peek(&self, tenant_id: &str) -> Option<Arc<TenantConfig>> {
        self.slots.get(tenant_id).and_then(|slot| slot.load())
    }

    /// Tenants with a loaded entry, sorted.
    pub fn known_tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = self
            .slots
            .iter()
            .filter(|entry| entry.value().load().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        tenants.sort();
        tenants
    }

    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().load().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the tenant's configuration, loading it from the store or
    /// creating a default record on first access. Concurrent first fetches
    /// for one tenant share a single store read.
    #[instrument(skip(self), fields(tenant = %tenant_id))]
    pub async fn fetch(&self, tenant_id: &str) -> Result<Arc<TenantConfig>, ConfigError> {
        validate_tenant_id(tenant_id)?;
        let slot = self.slot(tenant_id);
        if let Some(config) = slot.load() {
            return Ok(config);
        }

        let _io = slot.io.lock().await;
        if let Some(config) = slot.load() {
            return Ok(config);
        }
        self.load_locked(tenant_id, &slot).await
    }

    /// Applies `mutator` to the tenant's settings, persists the result, and
    /// only then swaps it into the cache.
    pub async fn update<F>(&self, tenant_id: &str, mutator: F) -> Result<Arc<TenantConfig>, ConfigError>
    where
        F: FnOnce(&mut TenantSettings) + Send,
    {
        self.update_with(tenant_id, mutator)
            .await
            .map(|(config, ())| config)
    }

    /// Like [`update`](Self::update), also returning the mutator's result.
    #[instrument(skip(self, mutator), fields(tenant = %tenant_id))]
    pub async fn update_with<F, R>(
        &self,
        tenant_id: &str,
        mutator: F,
    ) -> Result<(Arc<TenantConfig>, R), ConfigError>
    where
        F: FnOnce(&mut TenantSettings) -> R + Send,
        R: Send,
    {
        validate_tenant_id(tenant_id)?;
        let slot = self.slot(tenant_id);
        let _io = slot.io.lock().await;

        let current = match slot.load() {
            Some(config) => config,
            None => self.load_locked(tenant_id, &slot).await?,
        };

        let mut next = TenantConfig::clone(&current);
        let result = mutator(&mut next.settings);
        next.last_modified_at = next_modified_at(current.last_modified_at);

        self.with_retry(tenant_id, || self.store.put(tenant_id, &next))
            .await?;

        let next = Arc::new(next);
        slot.store(Arc::clone(&next));
        debug!(last_modified_at = %next.last_modified_at, "tenant config updated");
        Ok((next, result))
    }

    /// Re-reads every loaded tenant from the store. Failures are counted and
    /// logged per tenant; the sweep always completes.
    pub async fn refresh_all(&self) -> RefreshReport {
        let tenants: Vec<(String, Arc<TenantSlot>)> = self
            .slots
            .iter()
            .filter(|entry| entry.value().load().is_some())
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let outcomes: Vec<(String, RefreshOutcome)> = stream::iter(tenants)
            .map(|(tenant_id, slot)| async move {
                let outcome = self.refresh_one(&tenant_id, &slot).await;
                (tenant_id, outcome)
            })
            .buffer_unordered(self.refresh_concurrency)
            .collect()
            .await;

        let mut report = RefreshReport::default();
        for (tenant_id, outcome) in outcomes {
            match outcome {
                RefreshOutcome::Refreshed => report.refreshed += 1,
                RefreshOutcome::Unchanged => report.unchanged += 1,
                RefreshOutcome::Missing => report.missing += 1,
                RefreshOutcome::Failed => {
                    report.failed += 1;
                    report.failed_tenants.push(tenant_id);
                }
            }
        }
        report.failed_tenants.sort();
        report
    }

    /// Spawns the periodic resync. The first sweep runs one `period` after
    /// start.
    pub fn start_refresh_task(&self, period: Duration) -> RefreshTask {
        let cache = self.clone();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = cache.refresh_all().await;
                        if report.failed > 0 {
                            warn!(
                                failed = report.failed,
                                refreshed = report.refreshed,
                                "tenant config refresh completed with failures"
                            );
                        } else {
                            debug!(
                                refreshed = report.refreshed,
                                unchanged = report.unchanged,
                                missing = report.missing,
                                "tenant config refresh completed"
                            );
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("tenant config refresh task stopped");
        });

        info!(interval_secs = period.as_secs(), "tenant config refresh task started");
        RefreshTask {
            shutdown: shutdown_tx,
            handle,
        }
    }

    fn slot(&self, tenant_id: &str) -> Arc<TenantSlot> {
        if let Some(slot) = self.slots.get(tenant_id) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.slots
                .entry(tenant_id.to_string())
                .or_default()
                .value(),
        )
    }

    // Caller holds `slot.io`.
    async fn load_locked(
        &self,
        tenant_id: &str,
        slot: &TenantSlot,
    ) -> Result<Arc<TenantConfig>, ConfigError> {
        let config = match self
            .with_retry(tenant_id, || self.store.get(tenant_id))
            .await?
        {
            Some(config) => config,
            None => {
                let config = TenantConfig::new_default(tenant_id);
                self.with_retry(tenant_id, || self.store.put(tenant_id, &config))
                    .await?;
                info!(tenant = %tenant_id, "created default tenant config");
                config
            }
        };

        let config = Arc::new(config);
        slot.store(Arc::clone(&config));
        Ok(config)
    }

    async fn refresh_one(&self, tenant_id: &str, slot: &TenantSlot) -> RefreshOutcome {
        let _io = slot.io.lock().await;
        match self.with_retry(tenant_id, || self.store.get(tenant_id)).await {
            Ok(Some(stored)) => {
                if slot.load().as_deref() == Some(&stored) {
                    RefreshOutcome::Unchanged
                } else {
                    slot.store(Arc::new(stored));
                    RefreshOutcome::Refreshed
                }
            }
            Ok(None) => {
                warn!(tenant = %tenant_id, "tenant config missing from store, keeping cached entry");
                RefreshOutcome::Missing
            }
            Err(err) => {
                warn!(tenant = %tenant_id, error = %err, "tenant config refresh failed");
                RefreshOutcome::Failed
            }
        }
    }

    /// Runs `call` and retries it once after the backoff when the first
    /// failure is transient.
    async fn with_retry<T, F, Fut>(&self, tenant_id: &str, mut call: F) -> Result<T, ConfigError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => err,
            Err(err) => return Err(rejected(tenant_id, err)),
        };

        warn!(
            tenant = %tenant_id,
            error = %err,
            backoff_ms = self.retry_backoff.as_millis() as u64,
            "transient store failure, retrying once"
        );
        sleep(self.retry_backoff).await;

        call().await.map_err(|err| {
            if err.is_transient() {
                ConfigError::StoreUnavailable {
                    tenant_id: tenant_id.to_string(),
                    source: err,
                }
            } else {
                rejected(tenant_id, err)
            }
        })
    }
}

fn rejected(tenant_id: &str, source: StoreError) -> ConfigError {
    ConfigError::StoreRejected {
        tenant_id: tenant_id.to_string(),
        source,
    }
}

pub fn validate_tenant_id(tenant_id: &str) -> Result<(), ConfigError> {
    let valid = !tenant_id.is_empty()
        && tenant_id.len() <= MAX_TENANT_ID_LEN
        && tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidTenantId(tenant_id.to_string()))
    }
}

/// Handle to the background resync started by
/// [`TenantConfigCache::start_refresh_task`].
pub struct RefreshTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals the task to stop and waits for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            warn!(error = %err, "tenant config refresh task ended abnormally");
        }
    }
}
