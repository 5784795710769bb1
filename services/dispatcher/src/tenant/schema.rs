pub const TENANT_CONFIGS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tenant_configs (
    tenant_id TEXT PRIMARY KEY,
    settings TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_modified_at TEXT NOT NULL
);
"#;

pub const TENANT_CONFIGS_DB_FILENAME: &str = "tenant_configs.db";
