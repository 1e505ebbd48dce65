//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Search by code, barcode or name
//! - CRUD operations with soft delete
//! - Stock adjustments and the low-stock report
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator types: "7891"                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Exact code or barcode?  ──yes──► that product first                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LIKE '%7891%' on code, barcode, name (active only, by name)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use pdv_core::validation::{
    validate_barcode, validate_price_cents, validate_product_code, validate_product_name,
};
use pdv_core::Product;

const COLUMNS: &str = "id, code, barcode, name, unit, price_cents, cost_cents, stock_quantity, \
     min_stock, track_inventory, allow_negative_stock, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by code, barcode or name.
    ///
    /// Exact code/barcode matches come first; an empty query lists active
    /// products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        let sql = format!(
            "SELECT {COLUMNS} FROM products \
             WHERE is_active = 1 \
               AND (?1 = '' \
                    OR code LIKE ?2 ESCAPE '\\' \
                    OR barcode LIKE ?2 ESCAPE '\\' \
                    OR name LIKE ?2 ESCAPE '\\') \
             ORDER BY (code = ?1 OR barcode = ?1) DESC, name \
             LIMIT ?3"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(query)
            .bind(like_pattern(query))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Gets a product by its internal code (case-insensitive).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE code = ?1 COLLATE NOCASE");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {COLUMNS} FROM products WHERE barcode = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Resolves what the operator typed at checkout: barcode, then code.
    pub async fn find_for_sale(&self, key: &str) -> DbResult<Product> {
        let key = key.trim();
        let found = match self.get_by_barcode(key).await? {
            Some(p) => Some(p),
            None => self.get_by_code(key).await?,
        };
        match found {
            Some(p) if p.is_active => Ok(p),
            _ => Err(DbError::not_found("Produto", key)),
        }
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// * `Rule` - invalid code, name, barcode or price
    /// * `UniqueViolation` - code or barcode already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate(product)?;
        debug!(code = %product.code, "Inserting product");

        let sql = format!(
            "INSERT INTO products ({COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        );

        sqlx::query(&sql)
            .bind(&product.id)
            .bind(product.code.trim())
            .bind(&product.barcode)
            .bind(product.name.trim())
            .bind(&product.unit)
            .bind(product.price_cents)
            .bind(product.cost_cents)
            .bind(product.stock_quantity)
            .bind(product.min_stock)
            .bind(product.track_inventory)
            .bind(product.allow_negative_stock)
            .bind(product.is_active)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| duplicate_key(e, product))?;

        Ok(product.clone())
    }

    /// Updates an existing product. Stock is not touched here; use
    /// [`adjust_stock`](Self::adjust_stock).
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate(product)?;
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2,
                barcode = ?3,
                name = ?4,
                unit = ?5,
                price_cents = ?6,
                cost_cents = ?7,
                min_stock = ?8,
                track_inventory = ?9,
                allow_negative_stock = ?10,
                is_active = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(product.code.trim())
        .bind(&product.barcode)
        .bind(product.name.trim())
        .bind(&product.unit)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.min_stock)
        .bind(product.track_inventory)
        .bind(product.allow_negative_stock)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_key(e, product))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Produto", &product.id));
        }

        Ok(())
    }

    /// Changes stock by `delta` (positive for purchases, negative for losses)
    /// and returns the new level.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<i64> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let mut conn = self.pool.acquire().await?;
        apply_stock_delta(&mut conn, id, delta).await?;

        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        stock.ok_or_else(|| DbError::not_found("Produto", id))
    }

    /// Soft-deletes a product. Past sales still reference it.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result =
            sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Produto", id));
        }

        Ok(())
    }

    /// Tracked active products at or below their minimum stock, lowest first.
    pub async fn low_stock(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM products \
             WHERE is_active = 1 AND track_inventory = 1 AND stock_quantity <= min_stock \
             ORDER BY stock_quantity - min_stock, name \
             LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Reads a product inside the caller's connection or transaction.
pub(crate) async fn product_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {COLUMNS} FROM products WHERE id = ?1");
    Ok(sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?)
}

/// Delta update on a tracked product's stock, inside the caller's connection
/// or transaction. Untracked products are left alone.
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products \
         SET stock_quantity = stock_quantity + CASE WHEN track_inventory = 1 THEN ?2 ELSE 0 END, \
             updated_at = ?3 \
         WHERE id = ?1",
    )
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Produto", id));
    }
    Ok(())
}

fn validate(product: &Product) -> DbResult<()> {
    validate_product_code(&product.code)?;
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_price_cents(product.cost_cents)?;
    if let Some(barcode) = &product.barcode {
        validate_barcode(barcode)?;
    }
    Ok(())
}

/// Names the business key in UNIQUE failures.
fn duplicate_key(err: sqlx::Error, product: &Product) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.ends_with("barcode") => {
            DbError::duplicate("código de barras", product.barcode.clone().unwrap_or_default())
        }
        DbError::UniqueViolation { field, .. } if field.ends_with("code") => {
            DbError::duplicate("código", product.code.clone())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = testing::db().await;
        let mut p = testing::product("ARROZ-5KG", 2599, 10);
        p.barcode = Some("4006381333931".to_string());
        db.products().insert(&p).await.unwrap();

        let by_code = db.products().get_by_code("arroz-5kg").await.unwrap().unwrap();
        assert_eq!(by_code.id, p.id);

        let by_barcode = db
            .products()
            .get_by_barcode("4006381333931")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_barcode.price_cents, 2599);

        let found = db.products().find_for_sale("4006381333931").await.unwrap();
        assert_eq!(found.code, "ARROZ-5KG");
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = testing::db().await;
        testing::insert_product(&db, "FEIJAO", 899, 5).await;

        let err = db
            .products()
            .insert(&testing::product("FEIJAO", 999, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "código"));
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let db = testing::db().await;
        let mut p = testing::product("OK", 100, 1);
        p.barcode = Some("123".to_string());
        assert!(matches!(
            db.products().insert(&p).await,
            Err(DbError::Rule(_))
        ));
    }

    #[tokio::test]
    async fn test_search() {
        let db = testing::db().await;
        testing::insert_product(&db, "CAFE", 1500, 5).await;
        testing::insert_product(&db, "ACUCAR", 500, 5).await;
        let gone = testing::insert_product(&db, "CAFE-VELHO", 100, 0).await;
        db.products().soft_delete(&gone.id).await.unwrap();

        let results = db.products().search("cafe", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].code, "CAFE");

        let all = db.products().search("", 10).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(db.products().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_adjust_stock_and_low_stock() {
        let db = testing::db().await;
        let p = testing::insert_product(&db, "LEITE", 450, 5).await;

        assert_eq!(db.products().adjust_stock(&p.id, -4).await.unwrap(), 1);
        let low = db.products().low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);

        assert_eq!(db.products().adjust_stock(&p.id, 10).await.unwrap(), 11);
        assert!(db.products().low_stock(10).await.unwrap().is_empty());

        assert!(matches!(
            db.products().adjust_stock("nope", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_and_soft_delete() {
        let db = testing::db().await;
        let mut p = testing::insert_product(&db, "PAO", 50, 100).await;

        p.price_cents = 75;
        p.name = "Pão francês".to_string();
        db.products().update(&p).await.unwrap();
        let stored = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stored.price_cents, 75);
        assert_eq!(stored.stock_quantity, 100);

        db.products().soft_delete(&p.id).await.unwrap();
        assert!(db.products().find_for_sale("PAO").await.is_err());
    }
}
