//! # Repository Module
//!
//! Database repository implementations for Balcão PDV.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CLI command                                                            │
//! │       │  db.products().search("arroz", 20)                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                      │
//! │  ├── search(&self, query, limit)                                        │
//! │  ├── get_by_id(&self, id)                                               │
//! │  ├── insert(&self, product)                                             │
//! │  └── update(&self, product)                                             │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes that touch several tables (finalizing or cancelling a sale,
//! receiving a payment, closing the register) run in one transaction. The
//! shared steps live in `pub(crate)` helpers that take a connection, so a
//! sale can record its cash movement inside the sale's own transaction.

pub mod account;
pub mod cash;
pub mod company;
pub mod employee;
pub mod person;
pub mod printer;
pub mod product;
pub mod sale;
pub mod settings;
pub mod title;
pub mod user;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

/// New UUID v4 string.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Start of a local calendar day, in UTC.
pub(crate) fn day_start_utc(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// `[start, end)` UTC bounds of a local calendar day.
pub(crate) fn day_bounds_utc(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.succ_opt().unwrap_or(date);
    (day_start_utc(date), day_start_utc(next))
}

/// Builds a `LIKE` pattern matching `text` anywhere, escaping wildcards.
pub(crate) fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Empty or whitespace-only strings become `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let t = v.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by repository tests.

    use chrono::Utc;
    use pdv_core::{Person, PersonKind, Product};

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Creates an admin login and returns its id.
    pub async fn user(db: &Database) -> String {
        db.users()
            .create("caixa", "1234", None, true)
            .await
            .unwrap()
            .id
    }

    pub fn product(code: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: super::new_id(),
            code: code.to_string(),
            barcode: None,
            name: format!("Produto {}", code),
            unit: "UN".to_string(),
            price_cents,
            cost_cents: price_cents / 2,
            stock_quantity: stock,
            min_stock: 1,
            track_inventory: true,
            allow_negative_stock: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert_product(db: &Database, code: &str, price_cents: i64, stock: i64) -> Product {
        let p = product(code, price_cents, stock);
        db.products().insert(&p).await.unwrap();
        p
    }

    pub fn customer(name: &str) -> Person {
        let now = Utc::now();
        Person {
            id: super::new_id(),
            kind: PersonKind::Customer,
            name: name.to_string(),
            trade_name: None,
            document: None,
            email: None,
            phone: None,
            address: Default::default(),
            credit_limit_cents: 0,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert_customer(db: &Database, name: &str) -> Person {
        let p = customer(name);
        db.people().insert(&p).await.unwrap();
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("arroz"), "%arroz%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[test]
    fn test_day_bounds_are_one_day_apart() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let (start, end) = day_bounds_utc(date);
        assert_eq!((end - start).num_hours(), 24);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" x ".to_string())), Some("x".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
