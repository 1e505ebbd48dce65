//! # Title Repository
//!
//! Accounts receivable (contas a receber) and payable (contas a pagar).
//! Both live in one table, told apart by `kind`.
//!
//! ```text
//!   create ──► Open ──pay(part)──► Partial ──pay(rest)──► Paid
//!               │                    │
//!               └────── cancel ──────┴──► Cancelled
//! ```

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::cash::{insert_movement, open_session_id};
use crate::repository::new_id;
use pdv_core::validation::{validate_name, validate_payment_amount};
use pdv_core::{
    CashMovementKind, CoreError, Money, PaymentMethod, Title, TitleKind, TitlePayment, TitleStatus,
};

const COLUMNS: &str = "id, kind, person_id, description, amount_cents, paid_cents, due_date, \
     status, created_at, paid_at";

const PAYMENT_COLUMNS: &str = "id, title_id, amount_cents, method, user_id, paid_at";

/// A title to register.
#[derive(Debug, Clone)]
pub struct NewTitle {
    pub kind: TitleKind,
    pub person_id: Option<String>,
    pub description: String,
    pub amount: Money,
    pub due_date: NaiveDate,
}

/// Listing criteria. `today` decides what counts as overdue.
#[derive(Debug, Clone)]
pub struct TitleFilter {
    pub kind: TitleKind,
    pub status: Option<TitleStatus>,
    pub overdue_only: bool,
    pub person_id: Option<String>,
    pub today: NaiveDate,
}

impl TitleFilter {
    pub fn new(kind: TitleKind, today: NaiveDate) -> Self {
        TitleFilter {
            kind,
            status: None,
            overdue_only: false,
            person_id: None,
            today,
        }
    }
}

/// Result of a payment.
#[derive(Debug, Clone, Serialize)]
pub struct TitleSettlement {
    pub title: Title,
    pub payment: TitlePayment,
}

#[derive(Debug, Clone)]
pub struct TitleRepository {
    pool: SqlitePool,
}

impl TitleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TitleRepository { pool }
    }

    pub async fn create(&self, new_title: NewTitle) -> DbResult<Title> {
        validate_name("descrição", &new_title.description, 200)?;
        validate_payment_amount(new_title.amount.cents())?;

        let title = Title {
            id: new_id(),
            kind: new_title.kind,
            person_id: new_title.person_id,
            description: new_title.description.trim().to_string(),
            amount_cents: new_title.amount.cents(),
            paid_cents: 0,
            due_date: new_title.due_date,
            status: TitleStatus::Open,
            created_at: Utc::now(),
            paid_at: None,
        };

        debug!(id = %title.id, kind = ?title.kind, amount = %new_title.amount, "Creating title");

        let sql = format!(
            "INSERT INTO titles ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        );
        sqlx::query(&sql)
            .bind(&title.id)
            .bind(title.kind)
            .bind(&title.person_id)
            .bind(&title.description)
            .bind(title.amount_cents)
            .bind(title.paid_cents)
            .bind(title.due_date)
            .bind(title.status)
            .bind(title.created_at)
            .bind(title.paid_at)
            .execute(&self.pool)
            .await?;

        Ok(title)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Title>> {
        let sql = format!("SELECT {COLUMNS} FROM titles WHERE id = ?1");
        Ok(sqlx::query_as::<_, Title>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Titles by due date, soonest first.
    pub async fn list(&self, filter: &TitleFilter) -> DbResult<Vec<Title>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM titles WHERE kind = "));
        qb.push_bind(filter.kind);

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if filter.overdue_only {
            qb.push(" AND status IN ('open', 'partial') AND due_date < ")
                .push_bind(filter.today);
        }
        if let Some(person_id) = &filter.person_id {
            qb.push(" AND person_id = ").push_bind(person_id.clone());
        }
        qb.push(" ORDER BY due_date, created_at");

        Ok(qb.build_query_as::<Title>().fetch_all(&self.pool).await?)
    }

    pub async fn payments(&self, title_id: &str) -> DbResult<Vec<TitlePayment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM title_payments WHERE title_id = ?1 ORDER BY paid_at, rowid"
        );
        Ok(sqlx::query_as::<_, TitlePayment>(&sql)
            .bind(title_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Pays all or part of a title.
    ///
    /// A receivable paid in cash while the register is open enters the drawer
    /// as a `Receipt` movement.
    ///
    /// ## Errors
    /// - `InvalidStatus` for paid or cancelled titles
    /// - `InvalidPaymentAmount` when `amount` exceeds the open balance
    pub async fn pay(
        &self,
        id: &str,
        amount: Money,
        method: PaymentMethod,
        user_id: &str,
    ) -> DbResult<TitleSettlement> {
        validate_payment_amount(amount.cents())?;

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {COLUMNS} FROM titles WHERE id = ?1");
        let title = sqlx::query_as::<_, Title>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Título", id))?;

        if !title.status.accepts_payment() {
            return Err(CoreError::InvalidStatus {
                entity: "Título".to_string(),
                id: title.id.clone(),
                status: title.status.label().to_string(),
            }
            .into());
        }

        let open = title.open_balance();
        if amount > open {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!("valor {} maior que o saldo em aberto {}", amount, open),
            }
            .into());
        }

        let now = Utc::now();
        let paid_cents = title.paid_cents + amount.cents();
        let status = TitleStatus::for_paid(paid_cents, title.amount_cents);
        let paid_at = (status == TitleStatus::Paid).then_some(now);

        sqlx::query("UPDATE titles SET paid_cents = ?2, status = ?3, paid_at = ?4 WHERE id = ?1")
            .bind(&title.id)
            .bind(paid_cents)
            .bind(status)
            .bind(paid_at)
            .execute(&mut *tx)
            .await?;

        let payment = TitlePayment {
            id: new_id(),
            title_id: title.id.clone(),
            amount_cents: amount.cents(),
            method,
            user_id: user_id.to_string(),
            paid_at: now,
        };
        let sql = format!(
            "INSERT INTO title_payments ({PAYMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        );
        sqlx::query(&sql)
            .bind(&payment.id)
            .bind(&payment.title_id)
            .bind(payment.amount_cents)
            .bind(payment.method)
            .bind(&payment.user_id)
            .bind(payment.paid_at)
            .execute(&mut *tx)
            .await?;

        if title.kind == TitleKind::Receivable && method == PaymentMethod::Cash {
            if let Some(session_id) = open_session_id(&mut *tx).await? {
                insert_movement(
                    &mut *tx,
                    &session_id,
                    CashMovementKind::Receipt,
                    amount,
                    Some(&title.description),
                    None,
                    user_id,
                )
                .await?;
            }
        }

        tx.commit().await?;

        info!(id = %title.id, kind = ?title.kind, amount = %amount, status = ?status, "Title payment");

        Ok(TitleSettlement {
            title: Title {
                paid_cents,
                status,
                paid_at,
                ..title
            },
            payment,
        })
    }

    /// Cancels a title that has not been fully paid.
    pub async fn cancel(&self, id: &str) -> DbResult<()> {
        let title = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Título", id))?;

        if !title.status.accepts_payment() {
            return Err(CoreError::InvalidStatus {
                entity: "Título".to_string(),
                id: title.id,
                status: title.status.label().to_string(),
            }
            .into());
        }

        sqlx::query("UPDATE titles SET status = 'cancelled' WHERE id = ?1 AND status IN ('open', 'partial')")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(id = %id, "Title cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;

    fn new_title(kind: TitleKind, cents: i64, due: NaiveDate) -> NewTitle {
        NewTitle {
            kind,
            person_id: None,
            description: "Duplicata 123".to_string(),
            amount: Money::from_cents(cents),
            due_date: due,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let t = db
            .titles()
            .create(new_title(TitleKind::Payable, 10_000, date(10)))
            .await
            .unwrap();

        let first = db
            .titles()
            .pay(&t.id, Money::from_cents(4_000), PaymentMethod::Pix, &user)
            .await
            .unwrap();
        assert_eq!(first.title.status, TitleStatus::Partial);
        assert_eq!(first.title.open_balance(), Money::from_cents(6_000));

        let err = db
            .titles()
            .pay(&t.id, Money::from_cents(6_001), PaymentMethod::Pix, &user)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InvalidPaymentAmount { .. })));

        let last = db
            .titles()
            .pay(&t.id, Money::from_cents(6_000), PaymentMethod::Pix, &user)
            .await
            .unwrap();
        assert_eq!(last.title.status, TitleStatus::Paid);
        assert!(last.title.paid_at.is_some());
        assert_eq!(db.titles().payments(&t.id).await.unwrap().len(), 2);

        assert!(matches!(
            db.titles().cancel(&t.id).await,
            Err(DbError::Rule(CoreError::InvalidStatus { .. }))
        ));
    }

    #[tokio::test]
    async fn test_list_overdue() {
        let db = testing::db().await;
        db.titles()
            .create(new_title(TitleKind::Receivable, 1_000, date(1)))
            .await
            .unwrap();
        db.titles()
            .create(new_title(TitleKind::Receivable, 2_000, date(20)))
            .await
            .unwrap();
        let cancelled = db
            .titles()
            .create(new_title(TitleKind::Receivable, 3_000, date(2)))
            .await
            .unwrap();
        db.titles().cancel(&cancelled.id).await.unwrap();
        db.titles()
            .create(new_title(TitleKind::Payable, 5_000, date(1)))
            .await
            .unwrap();

        let mut filter = TitleFilter::new(TitleKind::Receivable, date(10));
        assert_eq!(db.titles().list(&filter).await.unwrap().len(), 3);

        filter.overdue_only = true;
        let overdue = db.titles().list(&filter).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].amount_cents, 1_000);
        assert!(overdue[0].is_overdue(date(10)));
    }

    #[tokio::test]
    async fn test_cash_receivable_enters_register() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let session = db.cash().open(&user, Money::zero()).await.unwrap();

        let r = db
            .titles()
            .create(new_title(TitleKind::Receivable, 2_000, date(10)))
            .await
            .unwrap();
        db.titles()
            .pay(&r.id, Money::from_cents(2_000), PaymentMethod::Cash, &user)
            .await
            .unwrap();

        let p = db
            .titles()
            .create(new_title(TitleKind::Payable, 700, date(10)))
            .await
            .unwrap();
        db.titles()
            .pay(&p.id, Money::from_cents(700), PaymentMethod::Cash, &user)
            .await
            .unwrap();

        assert_eq!(
            db.cash().expected_balance(&session.id).await.unwrap(),
            Money::from_cents(2_000)
        );
    }
}
