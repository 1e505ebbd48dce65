//! # Employee Repository
//!
//! Employee (funcionário) registrations. A login may point at an employee;
//! deactivating the employee blocks that login.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::non_empty;
use pdv_core::validation::{validate_cpf, validate_email, validate_name, validate_phone};
use pdv_core::Employee;

const COLUMNS: &str = "id, name, cpf, role, phone, email, hired_on, salary_cents, \
     is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Employee>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM employees WHERE (?1 = 0 OR is_active = 1) ORDER BY name"
        );
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Employee>> {
        let sql = format!("SELECT {COLUMNS} FROM employees WHERE id = ?1");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_by_cpf(&self, cpf: &str) -> DbResult<Option<Employee>> {
        let sql = format!("SELECT {COLUMNS} FROM employees WHERE cpf = ?1");
        Ok(sqlx::query_as::<_, Employee>(&sql)
            .bind(pdv_core::validation::only_digits(cpf))
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn insert(&self, employee: &Employee) -> DbResult<Employee> {
        let e = normalize(employee.clone())?;
        debug!(id = %e.id, name = %e.name, "Inserting employee");

        let sql = format!(
            "INSERT INTO employees ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        );
        sqlx::query(&sql)
            .bind(&e.id)
            .bind(&e.name)
            .bind(&e.cpf)
            .bind(&e.role)
            .bind(&e.phone)
            .bind(&e.email)
            .bind(e.hired_on)
            .bind(e.salary_cents)
            .bind(e.is_active)
            .bind(e.created_at)
            .bind(e.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|err| duplicate_cpf(err, &e))?;

        Ok(e)
    }

    pub async fn update(&self, employee: &Employee) -> DbResult<Employee> {
        let e = normalize(employee.clone())?;
        debug!(id = %e.id, "Updating employee");

        let result = sqlx::query(
            r#"
            UPDATE employees SET
                name = ?2, cpf = ?3, role = ?4, phone = ?5, email = ?6,
                hired_on = ?7, salary_cents = ?8, is_active = ?9, updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&e.id)
        .bind(&e.name)
        .bind(&e.cpf)
        .bind(&e.role)
        .bind(&e.phone)
        .bind(&e.email)
        .bind(e.hired_on)
        .bind(e.salary_cents)
        .bind(e.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| duplicate_cpf(err, &e))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Funcionário", &e.id));
        }
        Ok(e)
    }

    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE employees SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(active)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Funcionário", id));
        }
        Ok(())
    }
}

fn normalize(mut e: Employee) -> DbResult<Employee> {
    validate_name("nome", &e.name, 120)?;
    validate_name("cargo", &e.role, 60)?;
    e.name = e.name.trim().to_string();
    e.role = e.role.trim().to_string();

    e.cpf = match non_empty(e.cpf) {
        Some(c) => Some(validate_cpf(&c)?),
        None => None,
    };
    e.phone = match non_empty(e.phone) {
        Some(p) => Some(validate_phone(&p)?),
        None => None,
    };
    e.email = match non_empty(e.email) {
        Some(m) => Some(validate_email(&m)?),
        None => None,
    };
    if e.salary_cents < 0 {
        return Err(pdv_core::ValidationError::MustBePositive {
            field: "salário".to_string(),
        }
        .into());
    }
    Ok(e)
}

fn duplicate_cpf(err: sqlx::Error, e: &Employee) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.ends_with("cpf") => {
            DbError::duplicate("CPF", e.cpf.clone().unwrap_or_default())
        }
        other => other,
    }
}

#[cfg(test)]
pub(crate) fn sample(name: &str) -> Employee {
    let now = Utc::now();
    Employee {
        id: crate::repository::new_id(),
        name: name.to_string(),
        cpf: None,
        role: "Caixa".to_string(),
        phone: None,
        email: None,
        hired_on: None,
        salary_cents: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_insert_get_and_list() {
        let db = testing::db().await;
        let mut e = sample("Ana Lima");
        e.cpf = Some("529.982.247-25".to_string());
        e.hired_on = NaiveDate::from_ymd_opt(2023, 2, 1);
        e.salary_cents = 180_000;
        db.employees().insert(&e).await.unwrap();

        let by_cpf = db.employees().get_by_cpf("52998224725").await.unwrap().unwrap();
        assert_eq!(by_cpf.name, "Ana Lima");
        assert_eq!(by_cpf.hired_on, NaiveDate::from_ymd_opt(2023, 2, 1));

        let other = sample("Bruno");
        db.employees().insert(&other).await.unwrap();
        db.employees().set_active(&other.id, false).await.unwrap();

        assert_eq!(db.employees().list(true).await.unwrap().len(), 1);
        assert_eq!(db.employees().list(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_cpf() {
        let db = testing::db().await;
        let mut a = sample("A");
        a.cpf = Some("52998224725".to_string());
        db.employees().insert(&a).await.unwrap();

        let mut b = sample("B");
        b.cpf = Some("529.982.247-25".to_string());
        let err = db.employees().insert(&b).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "CPF"));
    }

    #[tokio::test]
    async fn test_update_missing() {
        let db = testing::db().await;
        let ghost = sample("Fantasma");
        assert!(matches!(
            db.employees().update(&ghost).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
