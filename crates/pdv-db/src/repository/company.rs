//! Company (store owner) registration: a single row printed on receipts.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use crate::repository::{new_id, non_empty};
use pdv_core::validation::{
    validate_cep, validate_cnpj, validate_email, validate_name, validate_phone, validate_uf,
};
use pdv_core::Company;

const COLUMNS: &str = "id, legal_name, trade_name, cnpj, state_registration, phone, email, \
     cep, street, number, complement, district, city, state, updated_at";

#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    /// The registered company, if any.
    pub async fn get(&self) -> DbResult<Option<Company>> {
        let sql = format!("SELECT {COLUMNS} FROM company ORDER BY updated_at DESC LIMIT 1");
        Ok(sqlx::query_as::<_, Company>(&sql)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Inserts or replaces the single company row. The existing id is kept.
    pub async fn upsert(&self, company: &Company) -> DbResult<Company> {
        let mut c = normalize(company.clone())?;
        c.id = match self.get().await? {
            Some(existing) => existing.id,
            None if c.id.is_empty() => new_id(),
            None => c.id,
        };
        c.updated_at = Utc::now();

        let sql = format!(
            "INSERT INTO company ({COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15) \
             ON CONFLICT(id) DO UPDATE SET \
                legal_name = excluded.legal_name, trade_name = excluded.trade_name, \
                cnpj = excluded.cnpj, state_registration = excluded.state_registration, \
                phone = excluded.phone, email = excluded.email, \
                cep = excluded.cep, street = excluded.street, number = excluded.number, \
                complement = excluded.complement, district = excluded.district, \
                city = excluded.city, state = excluded.state, updated_at = excluded.updated_at"
        );

        sqlx::query(&sql)
            .bind(&c.id)
            .bind(&c.legal_name)
            .bind(&c.trade_name)
            .bind(&c.cnpj)
            .bind(&c.state_registration)
            .bind(&c.phone)
            .bind(&c.email)
            .bind(&c.address.cep)
            .bind(&c.address.street)
            .bind(&c.address.number)
            .bind(&c.address.complement)
            .bind(&c.address.district)
            .bind(&c.address.city)
            .bind(&c.address.state)
            .bind(c.updated_at)
            .execute(&self.pool)
            .await?;

        info!(name = %c.legal_name, "Company registration saved");
        Ok(c)
    }
}

fn normalize(mut c: Company) -> DbResult<Company> {
    validate_name("razão social", &c.legal_name, 120)?;
    c.legal_name = c.legal_name.trim().to_string();
    c.trade_name = non_empty(c.trade_name);
    c.state_registration = non_empty(c.state_registration);
    c.cnpj = match non_empty(c.cnpj) {
        Some(v) => Some(validate_cnpj(&v)?),
        None => None,
    };
    c.phone = match non_empty(c.phone) {
        Some(v) => Some(validate_phone(&v)?),
        None => None,
    };
    c.email = match non_empty(c.email) {
        Some(v) => Some(validate_email(&v)?),
        None => None,
    };
    c.address.cep = match non_empty(c.address.cep.take()) {
        Some(v) => Some(validate_cep(&v)?),
        None => None,
    };
    c.address.state = match non_empty(c.address.state.take()) {
        Some(v) => Some(validate_uf(&v)?),
        None => None,
    };
    Ok(c)
}
