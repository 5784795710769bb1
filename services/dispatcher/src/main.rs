use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::serve;
use interaction_hub_dispatcher::{
    commands,
    config::{DispatcherConfig, StoreBackend},
    create_router,
    platform::{CommandPublisher, HttpCommandPublisher, PlatformClient},
    tenant::{HttpConfigStore, SqliteConfigStore},
    AccessLevelResolver, AppState, ConfigStore, DispatchRegistry, InteractionRouter,
    TenantConfigCache, TracingDiagnosticSink,
};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = DispatcherConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config);

    info!("interaction-hub-dispatcher starting");

    let table = commands::build_routing_table().context("failed to register built-in commands")?;
    let registry = Arc::new(DispatchRegistry::new(table));
    info!(routes = registry.snapshot().len(), "routing table built");

    let store = open_store(&config)?;
    let cache = TenantConfigCache::new(store).with_retry_backoff(config.retry_backoff());
    info!(backend = cache.backend(), "tenant config store ready");

    let platform = PlatformClient::new(
        &config.platform_api_base,
        &config.platform_application_id,
        config.platform_timeout_secs,
    )
    .context("failed to build platform client")?;

    let publisher: Option<Arc<dyn CommandPublisher>> = match &config.platform_bot_token {
        Some(token) if !config.platform_application_id.is_empty() => Some(Arc::new(
            HttpCommandPublisher::new(&platform, &config.platform_application_id, token),
        )),
        _ => {
            info!("command publication disabled, no application id or bot token configured");
            None
        }
    };

    if config.publish_on_startup {
        if let Some(publisher) = &publisher {
            let specs = registry.snapshot().publishable_specs();
            let published = publisher
                .bulk_set(&specs)
                .await
                .context("failed to publish application commands")?;
            info!(published, "application commands published on startup");
        }
    }

    let router = Arc::new(InteractionRouter::new(
        Arc::clone(&registry),
        cache.clone(),
        Arc::new(AccessLevelResolver::new(config.operator_ids.clone())),
        Arc::new(TracingDiagnosticSink),
        config.router_settings(),
    ));

    let refresh_task = match config.refresh_interval() {
        Some(interval) => Some(cache.start_refresh_task(interval)),
        None => {
            info!("periodic tenant config refresh disabled by configuration");
            None
        }
    };

    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN not set, administrative routes are disabled");
    }

    let app = create_router(AppState {
        router,
        responders: Arc::new(platform),
        publisher,
        registrar: commands::register_all,
        admin_token: config.admin_token.clone(),
    });

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("invalid server bind address")?;

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    let local_addr = listener
        .local_addr()
        .context("failed to read bound address")?;
    info!(%local_addr, "interaction-hub-dispatcher listening");

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server encountered an unrecoverable error")?;

    if let Some(task) = refresh_task {
        task.shutdown().await;
    }

    info!("interaction-hub-dispatcher shutdown complete");
    Ok(())
}

fn init_tracing(config: &DispatcherConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| std::env::var("LOG_LEVEL").map(EnvFilter::new))
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn open_store(config: &DispatcherConfig) -> Result<Arc<dyn ConfigStore>> {
    match config.store_backend {
        StoreBackend::Sqlite => {
            let store = SqliteConfigStore::open(&config.store_path).with_context(|| {
                format!(
                    "failed to open tenant config database in '{}'",
                    config.store_path.display()
                )
            })?;
            Ok(Arc::new(store))
        }
        StoreBackend::Http => {
            let url = config
                .store_url
                .as_deref()
                .context("CONFIG_STORE_URL is required for the http backend")?;
            let store = HttpConfigStore::new(url, config.store_timeout_secs)
                .context("failed to build http config store client")?;
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
