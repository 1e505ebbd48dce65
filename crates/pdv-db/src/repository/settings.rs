//! Key/value system settings.
//!
//! Known keys:
//!
//! | key                       | meaning                                   |
//! |---------------------------|-------------------------------------------|
//! | `ecommerce.enabled`       | unlocks the e-commerce area               |
//! | `ecommerce.url`           | storefront address shown to the operator  |
//! | `sale.require_open_cash`  | refuse sales while the register is closed |

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use pdv_core::{EcommerceAccess, Setting, ValidationError};

pub const ECOMMERCE_ENABLED: &str = "ecommerce.enabled";
pub const ECOMMERCE_URL: &str = "ecommerce.url";
pub const REQUIRE_OPEN_CASH: &str = "sale.require_open_cash";

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "sim" | "s" | "yes" | "on"
    )
}

/// Reads a boolean setting inside the caller's transaction. Missing is false.
pub(crate) async fn flag_on(conn: &mut SqliteConnection, key: &str) -> DbResult<bool> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(value.as_deref().map(parse_flag).unwrap_or(false))
}

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        Ok(
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn get_bool(&self, key: &str) -> DbResult<bool> {
        Ok(self.get(key).await?.as_deref().map(parse_flag).unwrap_or(false))
    }

    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError::required("chave").into());
        }

        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value.trim())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(key = %key, "Setting changed");
        Ok(())
    }

    pub async fn all(&self) -> DbResult<Vec<Setting>> {
        Ok(
            sqlx::query_as::<_, Setting>("SELECT key, value, updated_at FROM settings ORDER BY key")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Whether the e-commerce area is unlocked, and where it lives.
    pub async fn ecommerce_access(&self) -> DbResult<EcommerceAccess> {
        let enabled = self.get_bool(ECOMMERCE_ENABLED).await?;
        let url = self
            .get(ECOMMERCE_URL)
            .await?
            .filter(|u| !u.trim().is_empty());
        Ok(EcommerceAccess { enabled, url })
    }

    pub async fn set_ecommerce(&self, access: &EcommerceAccess) -> DbResult<()> {
        if let Some(url) = &access.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ValidationError::invalid("url", "deve começar com http:// ou https://").into());
            }
        }
        self.set(ECOMMERCE_ENABLED, if access.enabled { "true" } else { "false" })
            .await?;
        self.set(ECOMMERCE_URL, access.url.as_deref().unwrap_or(""))
            .await
    }
}
