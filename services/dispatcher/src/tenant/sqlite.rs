use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::error::StoreError;
use super::schema::{TENANT_CONFIGS_DB_FILENAME, TENANT_CONFIGS_SCHEMA};
use super::settings::{TenantConfig, TenantSettings};
use super::store::ConfigStore;

const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// Local SQLite-backed configuration store. Each call runs on the blocking
/// pool against a single shared connection.
pub struct SqliteConfigStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteConfigStore {
    /// Opens (creating if needed) `tenant_configs.db` inside `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)
            .map_err(|err| StoreError::Worker(format!("cannot create data dir: {err}")))?;
        let db_path = data_dir.join(TENANT_CONFIGS_DB_FILENAME);
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn, Some(db_path))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(TENANT_CONFIGS_SCHEMA)?;
        if let Some(path) = &path {
            info!(path = %path.display(), "tenant config database ready");
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            op(&conn)
        })
        .await
        .map_err(|err| StoreError::Worker(err.to_string()))?
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn get(&self, tenant_id: &str) -> Result<Option<TenantConfig>, StoreError> {
        let tenant_id = tenant_id.to_string();
        self.run(move |conn| {
            let row = conn
                .query_row(
                    r#"
                    SELECT settings, created_at, last_modified_at
                    FROM tenant_configs
                    WHERE tenant_id = ?1
                    "#,
                    params![tenant_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, DateTime<Utc>>(1)?,
                            row.get::<_, DateTime<Utc>>(2)?,
                        ))
                    },
                )
                .optional()?;

            match row {
                Some((settings, created_at, last_modified_at)) => {
                    let settings: TenantSettings = serde_json::from_str(&settings)?;
                    Ok(Some(TenantConfig {
                        tenant_id,
                        settings,
                        created_at,
                        last_modified_at,
                    }))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn put(&self, tenant_id: &str, record: &TenantConfig) -> Result<(), StoreError> {
        let tenant_id = tenant_id.to_string();
        let settings = serde_json::to_string(&record.settings)?;
        let created_at = record.created_at;
        let last_modified_at = record.last_modified_at;

        self.run(move |conn| {
            conn.execute(
                r#"
                INSERT INTO tenant_configs (tenant_id, settings, created_at, last_modified_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(tenant_id) DO UPDATE SET
                    settings = excluded.settings,
                    last_modified_at = excluded.last_modified_at
                "#,
                params![tenant_id, settings, created_at, last_modified_at],
            )?;
            debug!(tenant = %tenant_id, "tenant config persisted");
            Ok(())
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
