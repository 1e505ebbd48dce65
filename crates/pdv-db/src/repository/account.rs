//! # Current Account Repository
//!
//! Conta corrente: what each customer owes the store. Store-credit (fiado)
//! sales debit the account; payments and cancelled sales credit it.
//!
//! The balance is never stored; it is the sum of debits minus credits.

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::cash::{insert_movement, open_session_id};
use crate::repository::new_id;
use pdv_core::validation::{validate_name, validate_payment_amount};
use pdv_core::{AccountEntry, CashMovementKind, CoreError, EntryKind, Money, PaymentMethod};

const COLUMNS: &str = "id, person_id, kind, amount_cents, description, sale_id, created_at";

/// A customer with a positive balance.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Debtor {
    pub person_id: String,
    pub name: String,
    pub balance_cents: i64,
}

impl Debtor {
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

// =============================================================================
// Shared transaction steps
// =============================================================================

/// Current balance owed by a person.
pub(crate) async fn balance_on(conn: &mut SqliteConnection, person_id: &str) -> DbResult<Money> {
    let cents: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(CASE kind WHEN 'debit' THEN amount_cents ELSE -amount_cents END), 0)
        FROM account_entries
        WHERE person_id = ?1
        "#,
    )
    .bind(person_id)
    .fetch_one(conn)
    .await?;
    Ok(Money::from_cents(cents))
}

pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    person_id: &str,
    kind: EntryKind,
    amount: Money,
    description: &str,
    sale_id: Option<&str>,
) -> DbResult<AccountEntry> {
    let entry = AccountEntry {
        id: new_id(),
        person_id: person_id.to_string(),
        kind,
        amount_cents: amount.cents(),
        description: description.to_string(),
        sale_id: sale_id.map(str::to_string),
        created_at: Utc::now(),
    };

    debug!(person = %person_id, kind = ?kind, amount = %amount, "Account entry");

    let sql = format!("INSERT INTO account_entries ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)");
    sqlx::query(&sql)
        .bind(&entry.id)
        .bind(&entry.person_id)
        .bind(entry.kind)
        .bind(entry.amount_cents)
        .bind(&entry.description)
        .bind(&entry.sale_id)
        .bind(entry.created_at)
        .execute(conn)
        .await?;

    Ok(entry)
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Statement lines, oldest first.
    pub async fn entries(&self, person_id: &str) -> DbResult<Vec<AccountEntry>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM account_entries WHERE person_id = ?1 ORDER BY created_at, rowid"
        );
        Ok(sqlx::query_as::<_, AccountEntry>(&sql)
            .bind(person_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn balance(&self, person_id: &str) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        balance_on(&mut *conn, person_id).await
    }

    /// Manual debit (e.g. an opening balance carried over from paper).
    pub async fn debit(
        &self,
        person_id: &str,
        amount: Money,
        description: &str,
    ) -> DbResult<AccountEntry> {
        validate_payment_amount(amount.cents())?;
        validate_name("descrição", description, 200)?;

        let mut conn = self.pool.acquire().await?;
        let entry = insert_entry(
            &mut *conn,
            person_id,
            EntryKind::Debit,
            amount,
            description.trim(),
            None,
        )
        .await?;

        info!(person = %person_id, amount = %amount, "Account debited");
        Ok(entry)
    }

    /// Customer payment against the account.
    ///
    /// A cash payment made while the register is open is also recorded as a
    /// `Receipt` drawer movement, in the same transaction.
    ///
    /// ## Errors
    /// - `InvalidPaymentAmount` for store credit or an amount above the balance
    pub async fn credit(
        &self,
        person_id: &str,
        amount: Money,
        method: PaymentMethod,
        user_id: &str,
        description: Option<&str>,
    ) -> DbResult<AccountEntry> {
        validate_payment_amount(amount.cents())?;
        if method == PaymentMethod::StoreCredit {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "conta corrente não pode ser paga com fiado".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let balance = balance_on(&mut *tx, person_id).await?;
        if amount > balance {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!("valor {} maior que o saldo devedor {}", amount, balance),
            }
            .into());
        }

        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Pagamento ({})", method.label()));

        let entry = insert_entry(
            &mut *tx,
            person_id,
            EntryKind::Credit,
            amount,
            &description,
            None,
        )
        .await?;

        if method == PaymentMethod::Cash {
            if let Some(session_id) = open_session_id(&mut *tx).await? {
                insert_movement(
                    &mut *tx,
                    &session_id,
                    CashMovementKind::Receipt,
                    amount,
                    Some(&description),
                    None,
                    user_id,
                )
                .await?;
            }
        }

        tx.commit().await?;

        info!(person = %person_id, amount = %amount, method = ?method, "Account payment received");
        Ok(entry)
    }

    /// Customers who owe something, largest balance first.
    pub async fn debtors(&self) -> DbResult<Vec<Debtor>> {
        let debtors = sqlx::query_as::<_, Debtor>(
            r#"
            SELECT p.id AS person_id, p.name AS name,
                   SUM(CASE e.kind WHEN 'debit' THEN e.amount_cents ELSE -e.amount_cents END)
                       AS balance_cents
            FROM account_entries e
            JOIN people p ON p.id = e.person_id
            GROUP BY p.id, p.name
            HAVING balance_cents > 0
            ORDER BY balance_cents DESC, p.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(debtors)
    }
}
