//! # Cash Register Repository
//!
//! Cash sessions (caixa) and their drawer movements.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cash Session                                      │
//! │                                                                         │
//! │  open(user, R$ 100)                                                     │
//! │     └── CashSession { status: Open } + movement Opening  +100,00        │
//! │                                                                         │
//! │  during the day                                                         │
//! │     ├── sale paid in cash ────────────► Sale        +tendered-change    │
//! │     ├── supply (suprimento) ──────────► Supply      +amount             │
//! │     ├── withdraw (sangria) ───────────► Withdrawal  -amount             │
//! │     ├── account / receivable in cash ─► Receipt     +amount             │
//! │     └── cancelled cash sale ──────────► Refund      -amount             │
//! │                                                                         │
//! │  close(user, counted)                                                   │
//! │     └── expected = Σ movements; difference = counted - expected         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! At most one session is open at a time; a partial unique index enforces it.

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use pdv_core::validation::validate_payment_amount;
use pdv_core::{
    CashMovement, CashMovementKind, CashSession, CashStatus, CoreError, Money, ValidationError,
};

const SESSION_COLUMNS: &str = "id, opened_by, opened_at, opening_balance_cents, closed_by, \
     closed_at, counted_cents, expected_cents, status";

const MOVEMENT_COLUMNS: &str =
    "id, session_id, kind, amount_cents, description, sale_id, user_id, created_at";

/// Result of closing the register.
#[derive(Debug, Clone, Serialize)]
pub struct CashClosing {
    pub session: CashSession,
    pub expected: Money,
    pub counted: Money,
    /// counted - expected. Negative is a shortage.
    pub difference: Money,
}

// =============================================================================
// Shared transaction steps
// =============================================================================

/// Id of the open session, if any.
pub(crate) async fn open_session_id(conn: &mut SqliteConnection) -> DbResult<Option<String>> {
    Ok(
        sqlx::query_scalar("SELECT id FROM cash_sessions WHERE status = 'open' LIMIT 1")
            .fetch_optional(conn)
            .await?,
    )
}

/// Sum of a session's movements: what should be in the drawer.
pub(crate) async fn session_balance(conn: &mut SqliteConnection, session_id: &str) -> DbResult<Money> {
    let cents: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM cash_movements WHERE session_id = ?1",
    )
    .bind(session_id)
    .fetch_one(conn)
    .await?;
    Ok(Money::from_cents(cents))
}

/// Records a drawer movement. `amount` is signed.
pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    session_id: &str,
    kind: CashMovementKind,
    amount: Money,
    description: Option<&str>,
    sale_id: Option<&str>,
    user_id: &str,
) -> DbResult<CashMovement> {
    let movement = CashMovement {
        id: new_id(),
        session_id: session_id.to_string(),
        kind,
        amount_cents: amount.cents(),
        description: description.map(str::to_string),
        sale_id: sale_id.map(str::to_string),
        user_id: user_id.to_string(),
        created_at: Utc::now(),
    };

    debug!(session = %session_id, kind = ?kind, amount = %amount, "Cash movement");

    let sql = format!(
        "INSERT INTO cash_movements ({MOVEMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    );
    sqlx::query(&sql)
        .bind(&movement.id)
        .bind(&movement.session_id)
        .bind(movement.kind)
        .bind(movement.amount_cents)
        .bind(&movement.description)
        .bind(&movement.sale_id)
        .bind(&movement.user_id)
        .bind(movement.created_at)
        .execute(conn)
        .await?;

    Ok(movement)
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CashRepository {
    pool: SqlitePool,
}

impl CashRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashRepository { pool }
    }

    /// The open session, if any.
    pub async fn current(&self) -> DbResult<Option<CashSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE status = 'open' LIMIT 1");
        Ok(sqlx::query_as::<_, CashSession>(&sql)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE id = ?1");
        Ok(sqlx::query_as::<_, CashSession>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Most recent sessions first.
    pub async fn history(&self, limit: u32) -> DbResult<Vec<CashSession>> {
        let sql =
            format!("SELECT {SESSION_COLUMNS} FROM cash_sessions ORDER BY opened_at DESC LIMIT ?1");
        Ok(sqlx::query_as::<_, CashSession>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Opens the register with an opening float.
    ///
    /// ## Errors
    /// - `CashAlreadyOpen` if a session is open
    pub async fn open(&self, user_id: &str, opening: Money) -> DbResult<CashSession> {
        if opening.is_negative() {
            return Err(ValidationError::MustBePositive {
                field: "valor de abertura".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        if open_session_id(&mut *tx).await?.is_some() {
            return Err(DbError::CashAlreadyOpen);
        }

        let session = CashSession {
            id: new_id(),
            opened_by: user_id.to_string(),
            opened_at: Utc::now(),
            opening_balance_cents: opening.cents(),
            closed_by: None,
            closed_at: None,
            counted_cents: None,
            expected_cents: None,
            status: CashStatus::Open,
        };

        let sql = format!(
            "INSERT INTO cash_sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        );
        sqlx::query(&sql)
            .bind(&session.id)
            .bind(&session.opened_by)
            .bind(session.opened_at)
            .bind(session.opening_balance_cents)
            .bind(&session.closed_by)
            .bind(session.closed_at)
            .bind(session.counted_cents)
            .bind(session.expected_cents)
            .bind(session.status)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::CashAlreadyOpen,
                other => other,
            })?;

        insert_movement(
            &mut *tx,
            &session.id,
            CashMovementKind::Opening,
            opening,
            Some("Abertura de caixa"),
            None,
            user_id,
        )
        .await?;

        tx.commit().await?;

        info!(session = %session.id, opening = %opening, "Cash register opened");
        Ok(session)
    }

    /// Suprimento: puts money into the drawer.
    pub async fn supply(
        &self,
        user_id: &str,
        amount: Money,
        description: Option<&str>,
    ) -> DbResult<CashMovement> {
        validate_payment_amount(amount.cents())?;

        let mut tx = self.pool.begin().await?;
        let session_id = open_session_id(&mut *tx).await?.ok_or(DbError::CashNotOpen)?;
        let movement = insert_movement(
            &mut *tx,
            &session_id,
            CashMovementKind::Supply,
            amount,
            description,
            None,
            user_id,
        )
        .await?;
        tx.commit().await?;

        info!(amount = %amount, "Cash supply");
        Ok(movement)
    }

    /// Sangria: takes money out of the drawer.
    ///
    /// ## Errors
    /// - `CashNotOpen`
    /// - `InsufficientCash` when `amount` exceeds the expected balance
    pub async fn withdraw(
        &self,
        user_id: &str,
        amount: Money,
        description: Option<&str>,
    ) -> DbResult<CashMovement> {
        validate_payment_amount(amount.cents())?;

        let mut tx = self.pool.begin().await?;
        let session_id = open_session_id(&mut *tx).await?.ok_or(DbError::CashNotOpen)?;

        let available = session_balance(&mut *tx, &session_id).await?;
        if amount > available {
            return Err(CoreError::InsufficientCash {
                available: available.to_string(),
                requested: amount.to_string(),
            }
            .into());
        }

        let movement = insert_movement(
            &mut *tx,
            &session_id,
            CashMovementKind::Withdrawal,
            -amount,
            description,
            None,
            user_id,
        )
        .await?;
        tx.commit().await?;

        info!(amount = %amount, "Cash withdrawal");
        Ok(movement)
    }

    pub async fn movements(&self, session_id: &str) -> DbResult<Vec<CashMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cash_movements WHERE session_id = ?1 ORDER BY created_at, rowid"
        );
        Ok(sqlx::query_as::<_, CashMovement>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// What should be in the drawer for a session.
    pub async fn expected_balance(&self, session_id: &str) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        session_balance(&mut *conn, session_id).await
    }

    /// Closes the open session with the amount the operator counted.
    pub async fn close(&self, user_id: &str, counted: Money) -> DbResult<CashClosing> {
        if counted.is_negative() {
            return Err(ValidationError::MustBePositive {
                field: "valor contado".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        let session_id = open_session_id(&mut *tx).await?.ok_or(DbError::CashNotOpen)?;
        let expected = session_balance(&mut *tx, &session_id).await?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE cash_sessions SET
                status = 'closed', closed_by = ?2, closed_at = ?3,
                counted_cents = ?4, expected_cents = ?5
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(&session_id)
        .bind(user_id)
        .bind(now)
        .bind(counted.cents())
        .bind(expected.cents())
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE id = ?1");
        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(&session_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let difference = counted - expected;
        if difference.is_zero() {
            info!(session = %session_id, expected = %expected, "Cash register closed");
        } else {
            warn!(
                session = %session_id,
                expected = %expected,
                counted = %counted,
                difference = %difference,
                "Cash register closed with difference"
            );
        }

        Ok(CashClosing {
            session,
            expected,
            counted,
            difference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;

    #[tokio::test]
    async fn test_open_only_once() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        assert!(db.cash().current().await.unwrap().is_none());

        let session = db.cash().open(&user, Money::from_cents(10_000)).await.unwrap();
        assert!(session.is_open());
        assert!(matches!(
            db.cash().open(&user, Money::zero()).await,
            Err(DbError::CashAlreadyOpen)
        ));

        let movements = db.cash().movements(&session.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, CashMovementKind::Opening);
    }

    #[tokio::test]
    async fn test_supply_withdraw_and_close() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        let session = db.cash().open(&user, Money::from_cents(10_000)).await.unwrap();

        db.cash()
            .supply(&user, Money::from_cents(5_000), Some("troco"))
            .await
            .unwrap();
        let w = db
            .cash()
            .withdraw(&user, Money::from_cents(3_000), None)
            .await
            .unwrap();
        assert_eq!(w.amount_cents, -3_000);

        assert_eq!(
            db.cash().expected_balance(&session.id).await.unwrap(),
            Money::from_cents(12_000)
        );

        let closing = db.cash().close(&user, Money::from_cents(11_500)).await.unwrap();
        assert_eq!(closing.expected, Money::from_cents(12_000));
        assert_eq!(closing.difference, Money::from_cents(-500));
        assert_eq!(closing.session.status, CashStatus::Closed);
        assert_eq!(closing.session.difference(), Some(Money::from_cents(-500)));
        assert!(db.cash().current().await.unwrap().is_none());

        // A new session may be opened after closing.
        db.cash().open(&user, Money::zero()).await.unwrap();
        assert_eq!(db.cash().history(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_withdraw_cannot_exceed_balance() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        db.cash().open(&user, Money::from_cents(1_000)).await.unwrap();

        let err = db
            .cash()
            .withdraw(&user, Money::from_cents(1_001), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InsufficientCash { .. })));
    }

    #[tokio::test]
    async fn test_operations_need_open_session() {
        let db = testing::db().await;
        let user = testing::user(&db).await;
        assert!(matches!(
            db.cash().supply(&user, Money::from_cents(100), None).await,
            Err(DbError::CashNotOpen)
        ));
        assert!(matches!(
            db.cash().close(&user, Money::zero()).await,
            Err(DbError::CashNotOpen)
        ));
    }
}
