use interaction_hub_dispatcher::tenant::{
    next_modified_at, AiChatMode, FeatureValue, SqliteConfigStore, TenantConfig,
    TENANT_CONFIGS_DB_FILENAME,
};
use interaction_hub_dispatcher::ConfigStore;
use tempfile::tempdir;

fn sample_config(tenant_id: &str) -> TenantConfig {
    let mut config = TenantConfig::new_default(tenant_id);
    config.settings.admin_role_ids = vec!["10".to_string(), "11".to_string()];
    config.settings.ai_chat_mode = AiChatMode::RequireMention;
    config.settings.ai_chat_channel_ids = vec!["500".to_string()];
    config
        .settings
        .features
        .insert("beta".to_string(), FeatureValue::Flag(true));
    config
}

fn assert_same_record(actual: &TenantConfig, expected: &TenantConfig) {
    assert_eq!(actual.tenant_id, expected.tenant_id);
    assert_eq!(actual.settings, expected.settings);
    assert_eq!(
        actual.created_at.timestamp_micros(),
        expected.created_at.timestamp_micros()
    );
    assert_eq!(
        actual.last_modified_at.timestamp_micros(),
        expected.last_modified_at.timestamp_micros()
    );
}

#[tokio::test]
async fn test_missing_tenant_returns_none() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let store = SqliteConfigStore::open(temp_dir.path()).expect("failed to open store");

    let loaded = store.get("tenant_a").await.expect("failed to query store");

    assert!(loaded.is_none());
    assert_eq!(store.backend(), "sqlite");
    assert_eq!(
        store.path(),
        Some(temp_dir.path().join(TENANT_CONFIGS_DB_FILENAME).as_path())
    );
}

#[tokio::test]
async fn test_put_then_get_returns_record() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let store = SqliteConfigStore::open(temp_dir.path()).expect("failed to open store");
    let config = sample_config("tenant_a");

    store.put("tenant_a", &config).await.expect("failed to persist config");
    let loaded = store
        .get("tenant_a")
        .await
        .expect("failed to query store")
        .expect("record should exist");

    assert_same_record(&loaded, &config);
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let temp_dir = tempdir().expect("failed to create temp dir");
    let config = sample_config("tenant_a");
    {
        let store = SqliteConfigStore::open(temp_dir.path()).expect("failed to open store");
        store.put("tenant_a", &config).await.expect("failed to persist config");
    }

    let reopened = SqliteConfigStore::open(temp_dir.path()).expect("failed to reopen store");
    let loaded = reopened
        .get("tenant_a")
        .await
        .expect("failed to query store")
        .expect("record should survive reopen");

    assert_same_record(&loaded, &config);
}

#[tokio::test]
async fn test_upsert_replaces_settings_and_keeps_created_at() {
    let store = SqliteConfigStore::open_in_memory().expect("failed to open store");
    let original = sample_config("tenant_a");
    store.put("tenant_a", &original).await.expect("failed to persist config");

    let mut updated = original.clone();
    updated.settings.admin_role_ids.clear();
    updated.settings.ai_chat_mode = AiChatMode::AlwaysRespond;
    updated.last_modified_at = next_modified_at(original.last_modified_at);
    updated.created_at = updated.last_modified_at;
    store.put("tenant_a", &updated).await.expect("failed to persist update");

    let loaded = store
        .get("tenant_a")
        .await
        .expect("failed to query store")
        .expect("record should exist");

    assert!(loaded.settings.admin_role_ids.is_empty());
    assert_eq!(loaded.settings.ai_chat_mode, AiChatMode::AlwaysRespond);
    assert_eq!(
        loaded.created_at.timestamp_micros(),
        original.created_at.timestamp_micros()
    );
    assert_eq!(
        loaded.last_modified_at.timestamp_micros(),
        updated.last_modified_at.timestamp_micros()
    );
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let store = SqliteConfigStore::open_in_memory().expect("failed to open store");
    store
        .put("tenant_a", &sample_config("tenant_a"))
        .await
        .expect("failed to persist config");
    store
        .put("tenant_b", &TenantConfig::new_default("tenant_b"))
        .await
        .expect("failed to persist config");

    let a = store
        .get("tenant_a")
        .await
        .expect("failed to query store")
        .expect("tenant_a should exist");
    let b = store
        .get("tenant_b")
        .await
        .expect("failed to query store")
        .expect("tenant_b should exist");

    assert_eq!(a.settings.admin_role_ids.len(), 2);
    assert!(b.settings.admin_role_ids.is_empty());
    assert!(store.path().is_none());
}
