//! Runtime settings stored in the `settings` table
//!
//! Database-first configuration: every setting has a built-in default which
//! is written back when the row is missing or unparseable.

use crate::Result;
use sqlx::SqlitePool;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

pub const CAS_MAX_RETRIES_KEY: &str = "cas_max_retries";
pub const IMPORT_MAX_ROWS_KEY: &str = "import_max_rows";

const DEFAULT_CAS_MAX_RETRIES: u32 = 8;
const DEFAULT_IMPORT_MAX_ROWS: usize = 5000;

/// Defaults seeded at schema initialization
pub const DEFAULT_SETTINGS: [(&str, &str); 2] = [
    (CAS_MAX_RETRIES_KEY, "8"),
    (IMPORT_MAX_ROWS_KEY, "5000"),
];

/// Settings consulted by the inventory engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Attempts at a compare-and-swap quantity write before giving up
    pub cas_max_retries: u32,
    /// Largest accepted import batch
    pub import_max_rows: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            cas_max_retries: DEFAULT_CAS_MAX_RETRIES,
            import_max_rows: DEFAULT_IMPORT_MAX_ROWS,
        }
    }
}

impl RuntimeSettings {
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let cas_max_retries =
            get_or_init(pool, CAS_MAX_RETRIES_KEY, DEFAULT_CAS_MAX_RETRIES).await?;
        let import_max_rows =
            get_or_init(pool, IMPORT_MAX_ROWS_KEY, DEFAULT_IMPORT_MAX_ROWS).await?;

        Ok(Self {
            cas_max_retries: cas_max_retries.max(1),
            import_max_rows: import_max_rows.max(1),
        })
    }
}

/// Read a setting, returning `None` when missing or NULL
pub async fn get_setting<T: FromStr>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value.flatten() {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => {
                warn!("Setting '{}' has unparseable value '{}'", key, raw);
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

/// Write a setting (insert or replace)
pub async fn set_setting<T: Display>(pool: &SqlitePool, key: &str, value: T) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

async fn get_or_init<T>(pool: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display + Copy,
{
    match get_setting::<T>(pool, key).await? {
        Some(value) => Ok(value),
        None => {
            info!("Setting '{}' not set, using default: {}", key, default);
            set_setting(pool, key, default).await?;
            Ok(default)
        }
    }
}
