//! Tests for database initialization and runtime settings

use optistock_common::db::{
    get_setting, init_database, set_setting, RuntimeSettings, CAS_MAX_RETRIES_KEY,
    IMPORT_MAX_ROWS_KEY, SCHEMA_VERSION,
};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sub").join("optistock.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("optistock.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_schema_tables_exist() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("optistock.db")).await.unwrap();

    for table in ["lenses", "settings", "schema_version"] {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1, "table {} missing", table);
    }

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_lenses_table_rejects_negative_quantity() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("optistock.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO lenses (guid, box_number, quantity, created_at, updated_at)
         VALUES ('x', 'A1', -1, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "CHECK constraint should reject negative quantity");
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("optistock.db")).await.unwrap();

    let retries: Option<u32> = get_setting(&pool, CAS_MAX_RETRIES_KEY).await.unwrap();
    assert_eq!(retries, Some(8));

    let settings = RuntimeSettings::load(&pool).await.unwrap();
    assert_eq!(settings, RuntimeSettings::default());
}

#[tokio::test]
async fn test_runtime_settings_read_overrides_and_repair_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("optistock.db")).await.unwrap();

    set_setting(&pool, IMPORT_MAX_ROWS_KEY, 25).await.unwrap();
    set_setting(&pool, CAS_MAX_RETRIES_KEY, "lots").await.unwrap();

    let settings = RuntimeSettings::load(&pool).await.unwrap();
    assert_eq!(settings.import_max_rows, 25);
    assert_eq!(settings.cas_max_retries, 8);

    // The unparseable value was replaced by the default
    let repaired: Option<u32> = get_setting(&pool, CAS_MAX_RETRIES_KEY).await.unwrap();
    assert_eq!(repaired, Some(8));
}
