//! # Sale Repository
//!
//! Finalizing, querying and cancelling sales.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  Cart (pdv-core, in memory)                                             │
//! │     └── cart.tender(payments) → Tender                                  │
//! │                                                                         │
//! │  1. FINALIZE  (one transaction)                                         │
//! │     ├── receipt number from the daily counter  20240315-0007            │
//! │     ├── sales row                 status = completed                    │
//! │     ├── sale_items                snapshot of code / name / price       │
//! │     ├── payments                  one per tender line                   │
//! │     ├── products.stock_quantity   -= quantity (tracked products)        │
//! │     ├── cash_movements            Sale +cash kept (if register open)    │
//! │     └── account_entries           Debit store credit (fiado)            │
//! │                                                                         │
//! │  2. (OPTIONAL) CANCEL  (one transaction)                                │
//! │     ├── sales.status = cancelled                                        │
//! │     ├── stock returned                                                  │
//! │     ├── cash_movements            Refund -cash kept (if register open)  │
//! │     └── account_entries           Credit store credit                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure rolls the whole transaction back: a sale is either recorded
//! with all its effects or not at all.

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::account::{balance_on, insert_entry};
use crate::repository::cash::{insert_movement, open_session_id};
use crate::repository::product::{apply_stock_delta, product_on};
use crate::repository::settings::{flag_on, REQUIRE_OPEN_CASH};
use crate::repository::{day_bounds_utc, day_start_utc, new_id};
use pdv_core::validation::{validate_cart_size, validate_quantity};
use pdv_core::{
    Cart, CartLine, CashMovementKind, CoreError, EntryKind, Money, Payment, PaymentMethod, Sale,
    SaleItem, SaleStatus, Tender,
};

const COLUMNS: &str = "id, receipt_number, customer_id, user_id, cash_session_id, status, \
     subtotal_cents, discount_cents, total_cents, paid_cents, change_cents, notes, \
     created_at, cancelled_at, cancel_reason";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, code_snapshot, name_snapshot, \
     unit_price_cents, quantity, discount_cents, line_total_cents";

const PAYMENT_COLUMNS: &str =
    "id, sale_id, method, amount_cents, tendered_cents, change_cents, created_at";

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// A settled checkout, ready to be recorded.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub user_id: String,
    pub customer_id: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<CartLine>,
    /// Gross value of the lines.
    pub subtotal: Money,
    /// Line discounts plus the sale-level discount.
    pub discount: Money,
    pub total: Money,
    pub tender: Tender,
}

impl NewSale {
    /// Builds the sale from a cart and the tender computed for it.
    pub fn from_checkout(cart: &Cart, tender: Tender, user_id: impl Into<String>) -> Self {
        NewSale {
            user_id: user_id.into(),
            customer_id: cart.customer_id.clone(),
            notes: None,
            lines: cart.lines.clone(),
            subtotal: cart.subtotal(),
            discount: cart.discount_total(),
            total: cart.total(),
            tender,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() {
            None
        } else {
            Some(notes.trim().to_string())
        };
        self
    }

    fn check(&self) -> DbResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        validate_cart_size(self.lines.len().saturating_sub(1))?;
        for line in &self.lines {
            validate_quantity(line.quantity)?;
        }
        if self.subtotal - self.discount != self.total || self.tender.total != self.total {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!(
                    "totais inconsistentes: subtotal {}, desconto {}, total {}, pagamento sobre {}",
                    self.subtotal, self.discount, self.total, self.tender.total
                ),
            }
            .into());
        }
        if self.customer_id.is_none() && self.tender.amount_for(PaymentMethod::StoreCredit).is_positive() {
            return Err(CoreError::StoreCreditWithoutCustomer.into());
        }
        Ok(())
    }
}

/// A sale with its lines and payments.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payments: Vec<Payment>,
}

/// Criteria for listing sales. Dates are local calendar days, inclusive.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub customer_id: Option<String>,
    pub status: Option<SaleStatus>,
    pub limit: Option<u32>,
}

/// Totals for one business day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub sale_count: i64,
    pub cancelled_count: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    /// Amount applied per payment method, completed sales only.
    pub by_method: Vec<(PaymentMethod, Money)>,
}

#[derive(sqlx::FromRow)]
struct DayTotals {
    sale_count: i64,
    cancelled_count: i64,
    subtotal_cents: i64,
    discount_cents: i64,
    total_cents: i64,
}

const DEFAULT_LIST_LIMIT: u32 = 200;

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a settled checkout with all its effects.
    ///
    /// ## Errors
    /// - `CashNotOpen` when `sale.require_open_cash` is on and the register is closed
    /// - `InsufficientStock` when stock changed since the cart was built
    /// - `CreditLimitExceeded` when store credit passes the customer's limit
    pub async fn finalize(&self, new_sale: NewSale) -> DbResult<SaleDetail> {
        new_sale.check()?;

        let mut tx = self.pool.begin().await?;

        let session_id = open_session_id(&mut *tx).await?;
        if session_id.is_none() && flag_on(&mut *tx, REQUIRE_OPEN_CASH).await? {
            return Err(DbError::CashNotOpen);
        }

        let store_credit = new_sale.tender.amount_for(PaymentMethod::StoreCredit);
        if let (Some(customer_id), true) = (&new_sale.customer_id, store_credit.is_positive()) {
            check_credit_limit(&mut *tx, customer_id, store_credit).await?;
        }

        let receipt_number = next_receipt_number(&mut *tx, Local::now().date_naive()).await?;
        let now = Utc::now();

        let sale = Sale {
            id: new_id(),
            receipt_number,
            customer_id: new_sale.customer_id.clone(),
            user_id: new_sale.user_id.clone(),
            cash_session_id: session_id.clone(),
            status: SaleStatus::Completed,
            subtotal_cents: new_sale.subtotal.cents(),
            discount_cents: new_sale.discount.cents(),
            total_cents: new_sale.total.cents(),
            paid_cents: new_sale.tender.paid.cents(),
            change_cents: new_sale.tender.change.cents(),
            notes: new_sale.notes.clone(),
            created_at: now,
            cancelled_at: None,
            cancel_reason: None,
        };

        debug!(id = %sale.id, receipt = %sale.receipt_number, total = %new_sale.total, "Finalizing sale");

        let sql = format!(
            "INSERT INTO sales ({COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        );
        sqlx::query(&sql)
            .bind(&sale.id)
            .bind(&sale.receipt_number)
            .bind(&sale.customer_id)
            .bind(&sale.user_id)
            .bind(&sale.cash_session_id)
            .bind(sale.status)
            .bind(sale.subtotal_cents)
            .bind(sale.discount_cents)
            .bind(sale.total_cents)
            .bind(sale.paid_cents)
            .bind(sale.change_cents)
            .bind(&sale.notes)
            .bind(sale.created_at)
            .bind(sale.cancelled_at)
            .bind(&sale.cancel_reason)
            .execute(&mut *tx)
            .await?;

        let mut items = Vec::with_capacity(new_sale.lines.len());
        for line in &new_sale.lines {
            items.push(insert_item(&mut *tx, &sale.id, line).await?);
        }

        let mut payments = Vec::with_capacity(new_sale.tender.lines.len());
        for line in &new_sale.tender.lines {
            let payment = Payment {
                id: new_id(),
                sale_id: sale.id.clone(),
                method: line.method,
                amount_cents: line.amount.cents(),
                tendered_cents: line.tendered.cents(),
                change_cents: line.change.cents(),
                created_at: now,
            };
            let sql = format!(
                "INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            );
            sqlx::query(&sql)
                .bind(&payment.id)
                .bind(&payment.sale_id)
                .bind(payment.method)
                .bind(payment.amount_cents)
                .bind(payment.tendered_cents)
                .bind(payment.change_cents)
                .bind(payment.created_at)
                .execute(&mut *tx)
                .await?;
            payments.push(payment);
        }

        let cash_kept = new_sale.tender.cash_kept();
        if cash_kept.is_positive() {
            match &session_id {
                Some(session_id) => {
                    let description = format!("Venda {}", sale.receipt_number);
                    insert_movement(
                        &mut *tx,
                        session_id,
                        CashMovementKind::Sale,
                        cash_kept,
                        Some(&description),
                        Some(&sale.id),
                        &sale.user_id,
                    )
                    .await?;
                }
                None => warn!(receipt = %sale.receipt_number, "Cash sale recorded with the register closed"),
            }
        }

        if let (Some(customer_id), true) = (&sale.customer_id, store_credit.is_positive()) {
            let description = format!("Venda {}", sale.receipt_number);
            insert_entry(
                &mut *tx,
                customer_id,
                EntryKind::Debit,
                store_credit,
                &description,
                Some(&sale.id),
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            receipt = %sale.receipt_number,
            total = %new_sale.total,
            items = items.len(),
            "Sale finalized"
        );

        Ok(SaleDetail {
            sale,
            items,
            payments,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {COLUMNS} FROM sales WHERE id = ?1");
        Ok(sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_by_receipt(&self, receipt_number: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {COLUMNS} FROM sales WHERE receipt_number = ?1");
        Ok(sqlx::query_as::<_, Sale>(&sql)
            .bind(receipt_number.trim())
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid");
        Ok(sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn payments(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE sale_id = ?1 ORDER BY rowid");
        Ok(sqlx::query_as::<_, Payment>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Sale with items and payments, by id or receipt number.
    pub async fn detail(&self, key: &str) -> DbResult<SaleDetail> {
        let sale = match self.get_by_id(key).await? {
            Some(s) => s,
            None => self
                .get_by_receipt(key)
                .await?
                .ok_or_else(|| DbError::not_found("Venda", key))?,
        };
        let items = self.items(&sale.id).await?;
        let payments = self.payments(&sale.id).await?;
        Ok(SaleDetail {
            sale,
            items,
            payments,
        })
    }

    /// Newest first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM sales WHERE 1 = 1"));

        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(day_start_utc(from));
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at < ").push_bind(day_bounds_utc(to).1);
        }
        if let Some(customer_id) = &filter.customer_id {
            qb.push(" AND customer_id = ").push_bind(customer_id.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT) as i64);

        Ok(qb.build_query_as::<Sale>().fetch_all(&self.pool).await?)
    }

    /// Cancels a completed sale and reverses its effects.
    ///
    /// ## Errors
    /// - `NotFound`
    /// - `InvalidStatus` if the sale is already cancelled
    pub async fn cancel(&self, id: &str, reason: &str, user_id: &str) -> DbResult<Sale> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(pdv_core::ValidationError::required("motivo").into());
        }

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Venda", id))?;

        if sale.status != SaleStatus::Completed {
            return Err(CoreError::InvalidStatus {
                entity: "Venda".to_string(),
                id: sale.receipt_number.clone(),
                status: sale.status.label().to_string(),
            }
            .into());
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE sales SET status = 'cancelled', cancelled_at = ?2, cancel_reason = ?3 WHERE id = ?1",
        )
        .bind(&sale.id)
        .bind(now)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        let items: Vec<(String, i64)> =
            sqlx::query_as("SELECT product_id, quantity FROM sale_items WHERE sale_id = ?1")
                .bind(&sale.id)
                .fetch_all(&mut *tx)
                .await?;
        for (product_id, quantity) in &items {
            apply_stock_delta(&mut *tx, product_id, *quantity).await?;
        }

        let totals: Vec<(PaymentMethod, i64)> = sqlx::query_as(
            "SELECT method, SUM(amount_cents) FROM payments WHERE sale_id = ?1 GROUP BY method",
        )
        .bind(&sale.id)
        .fetch_all(&mut *tx)
        .await?;
        let amount_for = |method: PaymentMethod| {
            Money::from_cents(
                totals
                    .iter()
                    .filter(|(m, _)| *m == method)
                    .map(|(_, c)| *c)
                    .sum(),
            )
        };

        let description = format!("Cancelamento venda {}", sale.receipt_number);

        let cash = amount_for(PaymentMethod::Cash);
        if cash.is_positive() {
            match open_session_id(&mut *tx).await? {
                Some(session_id) => {
                    insert_movement(
                        &mut *tx,
                        &session_id,
                        CashMovementKind::Refund,
                        -cash,
                        Some(&description),
                        Some(&sale.id),
                        user_id,
                    )
                    .await?;
                }
                None => warn!(receipt = %sale.receipt_number, "Cash refund made with the register closed"),
            }
        }

        let store_credit = amount_for(PaymentMethod::StoreCredit);
        if let (Some(customer_id), true) = (&sale.customer_id, store_credit.is_positive()) {
            insert_entry(
                &mut *tx,
                customer_id,
                EntryKind::Credit,
                store_credit,
                &description,
                Some(&sale.id),
            )
            .await?;
        }

        tx.commit().await?;

        info!(receipt = %sale.receipt_number, reason = %reason, "Sale cancelled");

        Ok(Sale {
            status: SaleStatus::Cancelled,
            cancelled_at: Some(now),
            cancel_reason: Some(reason.to_string()),
            ..sale
        })
    }

    /// Totals for a local calendar day.
    pub async fn daily_summary(&self, date: NaiveDate) -> DbResult<DailySummary> {
        let (start, end) = day_bounds_utc(date);

        let totals = sqlx::query_as::<_, DayTotals>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS sale_count,
                COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0) AS cancelled_count,
                COALESCE(SUM(CASE WHEN status = 'completed' THEN subtotal_cents ELSE 0 END), 0) AS subtotal_cents,
                COALESCE(SUM(CASE WHEN status = 'completed' THEN discount_cents ELSE 0 END), 0) AS discount_cents,
                COALESCE(SUM(CASE WHEN status = 'completed' THEN total_cents ELSE 0 END), 0) AS total_cents
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let by_method: Vec<(PaymentMethod, i64)> = sqlx::query_as(
            r#"
            SELECT p.method, SUM(p.amount_cents)
            FROM payments p
            JOIN sales s ON s.id = p.sale_id
            WHERE s.status = 'completed' AND s.created_at >= ?1 AND s.created_at < ?2
            GROUP BY p.method
            ORDER BY p.method
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(DailySummary {
            date,
            sale_count: totals.sale_count,
            cancelled_count: totals.cancelled_count,
            subtotal: Money::from_cents(totals.subtotal_cents),
            discount: Money::from_cents(totals.discount_cents),
            total: Money::from_cents(totals.total_cents),
            by_method: by_method
                .into_iter()
                .map(|(m, c)| (m, Money::from_cents(c)))
                .collect(),
        })
    }
}

// =============================================================================
// Transaction steps
// =============================================================================

/// Next receipt number for `day`: `YYYYMMDD-NNNN`.
async fn next_receipt_number(conn: &mut SqliteConnection, day: NaiveDate) -> DbResult<String> {
    let key = day.format("%Y%m%d").to_string();
    let number: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO receipt_counters (day, last_number) VALUES (?1, 1)
        ON CONFLICT(day) DO UPDATE SET last_number = last_number + 1
        RETURNING last_number
        "#,
    )
    .bind(&key)
    .fetch_one(conn)
    .await?;
    Ok(format!("{}-{:04}", key, number))
}

/// Re-checks stock against the database, writes the item and takes the stock.
async fn insert_item(conn: &mut SqliteConnection, sale_id: &str, line: &CartLine) -> DbResult<SaleItem> {
    let product = product_on(&mut *conn, &line.product_id)
        .await?
        .ok_or_else(|| DbError::not_found("Produto", &line.product_id))?;

    if !product.is_active {
        return Err(CoreError::InvalidStatus {
            entity: "Produto".to_string(),
            id: product.code,
            status: "inativo".to_string(),
        }
        .into());
    }
    if !product.can_sell(line.quantity) {
        return Err(CoreError::InsufficientStock {
            code: product.code,
            available: product.stock_quantity,
            requested: line.quantity,
        }
        .into());
    }

    let item = SaleItem {
        id: new_id(),
        sale_id: sale_id.to_string(),
        product_id: line.product_id.clone(),
        code_snapshot: line.code.clone(),
        name_snapshot: line.name.clone(),
        unit_price_cents: line.unit_price_cents,
        quantity: line.quantity,
        discount_cents: line.discount_cents,
        line_total_cents: line.total().cents(),
    };

    let sql = format!(
        "INSERT INTO sale_items ({ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    );
    sqlx::query(&sql)
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.code_snapshot)
        .bind(&item.name_snapshot)
        .bind(item.unit_price_cents)
        .bind(item.quantity)
        .bind(item.discount_cents)
        .bind(item.line_total_cents)
        .execute(&mut *conn)
        .await?;

    apply_stock_delta(&mut *conn, &item.product_id, -item.quantity).await?;

    Ok(item)
}

/// Rejects store credit for unknown or inactive customers, or past the limit.
/// A zero limit means no limit.
async fn check_credit_limit(
    conn: &mut SqliteConnection,
    customer_id: &str,
    amount: Money,
) -> DbResult<()> {
    let row: Option<(i64, bool)> =
        sqlx::query_as("SELECT credit_limit_cents, is_active FROM people WHERE id = ?1")
            .bind(customer_id)
            .fetch_optional(&mut *conn)
            .await?;
    let (limit_cents, is_active) = row.ok_or_else(|| DbError::not_found("Cliente", customer_id))?;

    if !is_active {
        return Err(CoreError::InvalidStatus {
            entity: "Cliente".to_string(),
            id: customer_id.to_string(),
            status: "inativo".to_string(),
        }
        .into());
    }

    if limit_cents > 0 {
        let limit = Money::from_cents(limit_cents);
        let after = balance_on(&mut *conn, customer_id).await? + amount;
        if after > limit {
            return Err(CoreError::CreditLimitExceeded {
                limit: limit.to_string(),
                balance: after.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use crate::Database;
    use pdv_core::Discount;

    async fn checkout(
        db: &Database,
        user: &str,
        cart: &Cart,
        payments: &[(PaymentMethod, Money)],
    ) -> DbResult<SaleDetail> {
        let tender = cart.tender(payments)?;
        db.sales()
            .finalize(NewSale::from_checkout(cart, tender, user))
            .await
    }

    #[tokio::test]
    async fn test_finalize_records_everything() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let session = db.cash().open(&user, Money::from_cents(5_000)).await.unwrap();
        let arroz = testing::insert_product(&db, "ARROZ", 2_500, 10).await;
        let feijao = testing::insert_product(&db, "FEIJAO", 800, 10).await;

        let mut cart = Cart::new();
        cart.add(&arroz, 2).unwrap();
        cart.add(&feijao, 1).unwrap();
        cart.set_discount(Discount::Amount(Money::from_cents(300))).unwrap();
        assert_eq!(cart.total(), Money::from_cents(5_500));

        let detail = checkout(&db, &user, &cart, &[(PaymentMethod::Cash, Money::from_cents(10_000))])
            .await
            .unwrap();

        let today = Local::now().date_naive().format("%Y%m%d").to_string();
        assert_eq!(detail.sale.receipt_number, format!("{}-0001", today));
        assert_eq!(detail.sale.change_cents, 4_500);
        assert_eq!(detail.sale.cash_session_id.as_deref(), Some(session.id.as_str()));
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.payments[0].amount_cents, 5_500);
        assert_eq!(detail.payments[0].tendered_cents, 10_000);

        let stock = db.products().get_by_id(&arroz.id).await.unwrap().unwrap();
        assert_eq!(stock.stock_quantity, 8);

        assert_eq!(
            db.cash().expected_balance(&session.id).await.unwrap(),
            Money::from_cents(10_500)
        );

        let again = db.sales().detail(&detail.sale.receipt_number).await.unwrap();
        assert_eq!(again.sale.id, detail.sale.id);
        assert_eq!(again.items[0].name_snapshot, "Produto ARROZ");
    }

    #[tokio::test]
    async fn test_receipt_numbers_increment() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let p = testing::insert_product(&db, "BALA", 50, 100).await;

        let mut cart = Cart::new();
        cart.add(&p, 1).unwrap();
        let first = checkout(&db, &user, &cart, &[(PaymentMethod::Pix, Money::from_cents(50))])
            .await
            .unwrap();
        let second = checkout(&db, &user, &cart, &[(PaymentMethod::Pix, Money::from_cents(50))])
            .await
            .unwrap();

        assert!(first.sale.receipt_number.ends_with("-0001"));
        assert!(second.sale.receipt_number.ends_with("-0002"));
    }

    #[tokio::test]
    async fn test_zero_total_sale_has_no_payments() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let session = db.cash().open(&user, Money::from_cents(1_000)).await.unwrap();
        let p = testing::insert_product(&db, "BRINDE", 450, 5).await;

        let mut cart = Cart::new();
        cart.add(&p, 1).unwrap();
        cart.set_discount(Discount::Percent(10_000)).unwrap();
        assert!(cart.total().is_zero());

        let detail = checkout(&db, &user, &cart, &[]).await.unwrap();
        assert!(detail.payments.is_empty());
        assert_eq!(detail.sale.total_cents, 0);
        assert_eq!(detail.sale.change_cents, 0);
        assert_eq!(
            db.cash().expected_balance(&session.id).await.unwrap(),
            Money::from_cents(1_000)
        );

        db.sales().cancel(&detail.sale.id, "lançado errado", &user).await.unwrap();
        let stock = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stock.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_stock_rechecked_in_transaction() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let p = testing::insert_product(&db, "LEITE", 500, 3).await;

        let mut cart = Cart::new();
        cart.add(&p, 3).unwrap();
        // Someone else sold two meanwhile.
        db.products().adjust_stock(&p.id, -2).await.unwrap();

        let err = checkout(&db, &user, &cart, &[(PaymentMethod::Cash, Money::from_cents(1_500))])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InsufficientStock { available: 1, .. })));

        // Nothing was written.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
        let counters: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receipt_counters")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(counters, 0);
    }

    #[tokio::test]
    async fn test_store_credit_and_limit() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let p = testing::insert_product(&db, "CAFE", 1_000, 50).await;
        let mut customer = testing::customer("Dona Rosa");
        customer.credit_limit_cents = 2_500;
        db.people().insert(&customer).await.unwrap();

        let mut cart = Cart::new();
        cart.add(&p, 2).unwrap();
        cart.set_customer(Some(customer.id.clone()));

        checkout(&db, &user, &cart, &[(PaymentMethod::StoreCredit, Money::from_cents(2_000))])
            .await
            .unwrap();
        assert_eq!(
            db.accounts().balance(&customer.id).await.unwrap(),
            Money::from_cents(2_000)
        );

        let err = checkout(&db, &user, &cart, &[(PaymentMethod::StoreCredit, Money::from_cents(2_000))])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::CreditLimitExceeded { .. })));
    }

    #[tokio::test]
    async fn test_require_open_cash_setting() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let p = testing::insert_product(&db, "PAO", 100, 50).await;
        db.settings().set(REQUIRE_OPEN_CASH, "true").await.unwrap();

        let mut cart = Cart::new();
        cart.add(&p, 1).unwrap();
        assert!(matches!(
            checkout(&db, &user, &cart, &[(PaymentMethod::Cash, Money::from_cents(100))]).await,
            Err(DbError::CashNotOpen)
        ));

        db.cash().open(&user, Money::zero()).await.unwrap();
        assert!(checkout(&db, &user, &cart, &[(PaymentMethod::Cash, Money::from_cents(100))])
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_cancel_reverses_effects() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let session = db.cash().open(&user, Money::zero()).await.unwrap();
        let p = testing::insert_product(&db, "OLEO", 900, 10).await;
        let customer = testing::insert_customer(&db, "Seu Zé").await;

        let mut cart = Cart::new();
        cart.add(&p, 2).unwrap();
        cart.set_customer(Some(customer.id.clone()));
        let detail = checkout(
            &db,
            &user,
            &cart,
            &[
                (PaymentMethod::StoreCredit, Money::from_cents(800)),
                (PaymentMethod::Cash, Money::from_cents(2_000)),
            ],
        )
        .await
        .unwrap();
        assert_eq!(detail.sale.change_cents, 1_000);

        let cancelled = db
            .sales()
            .cancel(&detail.sale.id, "cliente desistiu", &user)
            .await
            .unwrap();
        assert!(cancelled.is_cancelled());

        let stock = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stock.stock_quantity, 10);
        assert_eq!(db.accounts().balance(&customer.id).await.unwrap(), Money::zero());
        assert_eq!(db.cash().expected_balance(&session.id).await.unwrap(), Money::zero());

        let err = db
            .sales()
            .cancel(&detail.sale.id, "de novo", &user)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn test_list_and_daily_summary() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let p = testing::insert_product(&db, "SUCO", 700, 50).await;

        let mut cart = Cart::new();
        cart.add(&p, 1).unwrap();
        let a = checkout(&db, &user, &cart, &[(PaymentMethod::Pix, Money::from_cents(700))])
            .await
            .unwrap();
        checkout(&db, &user, &cart, &[(PaymentMethod::Cash, Money::from_cents(1_000))])
            .await
            .unwrap();
        db.sales().cancel(&a.sale.id, "erro", &user).await.unwrap();

        let today = Local::now().date_naive();
        let all = db
            .sales()
            .list(&SaleFilter {
                from: Some(today),
                to: Some(today),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let completed = db
            .sales()
            .list(&SaleFilter {
                status: Some(SaleStatus::Completed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);

        let summary = db.sales().daily_summary(today).await.unwrap();
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.total, Money::from_cents(700));
        assert_eq!(summary.by_method, vec![(PaymentMethod::Cash, Money::from_cents(700))]);
    }
}
