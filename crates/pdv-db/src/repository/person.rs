//! # Person Repository
//!
//! Customers and suppliers share one table; `kind` says which role a
//! registration plays (`both` appears in either list).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{like_pattern, non_empty};
use pdv_core::validation::{
    validate_cep, validate_document, validate_email, validate_name, validate_phone, validate_uf,
};
use pdv_core::{Person, PersonKind};

const COLUMNS: &str = "id, kind, name, trade_name, document, email, phone, \
     cep, street, number, complement, district, city, state, \
     credit_limit_cents, notes, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PersonRepository {
    pool: SqlitePool,
}

impl PersonRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PersonRepository { pool }
    }

    /// Searches active people playing `kind` by name, trade name or document.
    ///
    /// `Customer` also returns `Both`, and so does `Supplier`.
    pub async fn search(&self, kind: PersonKind, query: &str, limit: u32) -> DbResult<Vec<Person>> {
        let query = query.trim();
        debug!(?kind, query = %query, "Searching people");

        let sql = format!(
            "SELECT {COLUMNS} FROM people \
             WHERE is_active = 1 \
               AND (kind = ?1 OR kind = 'both' OR ?1 = 'both') \
               AND (?2 = '' \
                    OR name LIKE ?3 ESCAPE '\\' \
                    OR trade_name LIKE ?3 ESCAPE '\\' \
                    OR document LIKE ?3 ESCAPE '\\') \
             ORDER BY name \
             LIMIT ?4"
        );

        let people = sqlx::query_as::<_, Person>(&sql)
            .bind(kind)
            .bind(query)
            .bind(like_pattern(query))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(people)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Person>> {
        let sql = format!("SELECT {COLUMNS} FROM people WHERE id = ?1");
        Ok(sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Looks up by CPF/CNPJ, punctuation ignored.
    pub async fn get_by_document(&self, document: &str) -> DbResult<Option<Person>> {
        let digits = pdv_core::validation::only_digits(document);
        let sql = format!("SELECT {COLUMNS} FROM people WHERE document = ?1");
        Ok(sqlx::query_as::<_, Person>(&sql)
            .bind(digits)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Inserts a registration after validating and normalizing it.
    /// Returns the stored form (document and phone as digits, UF uppercased).
    pub async fn insert(&self, person: &Person) -> DbResult<Person> {
        let person = normalize(person.clone())?;
        debug!(id = %person.id, name = %person.name, "Inserting person");

        let sql = format!(
            "INSERT INTO people ({COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        );

        sqlx::query(&sql)
            .bind(&person.id)
            .bind(person.kind)
            .bind(&person.name)
            .bind(&person.trade_name)
            .bind(&person.document)
            .bind(&person.email)
            .bind(&person.phone)
            .bind(&person.address.cep)
            .bind(&person.address.street)
            .bind(&person.address.number)
            .bind(&person.address.complement)
            .bind(&person.address.district)
            .bind(&person.address.city)
            .bind(&person.address.state)
            .bind(person.credit_limit_cents)
            .bind(&person.notes)
            .bind(person.is_active)
            .bind(person.created_at)
            .bind(person.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| duplicate_document(e, &person))?;

        Ok(person)
    }

    pub async fn update(&self, person: &Person) -> DbResult<Person> {
        let person = normalize(person.clone())?;
        debug!(id = %person.id, "Updating person");

        let result = sqlx::query(
            r#"
            UPDATE people SET
                kind = ?2, name = ?3, trade_name = ?4, document = ?5,
                email = ?6, phone = ?7,
                cep = ?8, street = ?9, number = ?10, complement = ?11,
                district = ?12, city = ?13, state = ?14,
                credit_limit_cents = ?15, notes = ?16, is_active = ?17,
                updated_at = ?18
            WHERE id = ?1
            "#,
        )
        .bind(&person.id)
        .bind(person.kind)
        .bind(&person.name)
        .bind(&person.trade_name)
        .bind(&person.document)
        .bind(&person.email)
        .bind(&person.phone)
        .bind(&person.address.cep)
        .bind(&person.address.street)
        .bind(&person.address.number)
        .bind(&person.address.complement)
        .bind(&person.address.district)
        .bind(&person.address.city)
        .bind(&person.address.state)
        .bind(person.credit_limit_cents)
        .bind(&person.notes)
        .bind(person.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_document(e, &person))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cadastro", &person.id));
        }
        Ok(person)
    }

    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE people SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cadastro", id));
        }
        Ok(())
    }
}

/// Validates and normalizes optional fields; blanks become `None`.
fn normalize(mut p: Person) -> DbResult<Person> {
    validate_name("nome", &p.name, 120)?;
    p.name = p.name.trim().to_string();
    p.trade_name = non_empty(p.trade_name);
    p.notes = non_empty(p.notes);

    p.document = match non_empty(p.document) {
        Some(d) => Some(validate_document(&d)?),
        None => None,
    };
    p.email = match non_empty(p.email) {
        Some(e) => Some(validate_email(&e)?),
        None => None,
    };
    p.phone = match non_empty(p.phone) {
        Some(ph) => Some(validate_phone(&ph)?),
        None => None,
    };

    let a = &mut p.address;
    a.cep = match non_empty(a.cep.take()) {
        Some(c) => Some(validate_cep(&c)?),
        None => None,
    };
    a.state = match non_empty(a.state.take()) {
        Some(uf) => Some(validate_uf(&uf)?),
        None => None,
    };
    a.street = non_empty(a.street.take());
    a.number = non_empty(a.number.take());
    a.complement = non_empty(a.complement.take());
    a.district = non_empty(a.district.take());
    a.city = non_empty(a.city.take());

    if p.credit_limit_cents < 0 {
        return Err(pdv_core::ValidationError::MustBePositive {
            field: "limite de crédito".to_string(),
        }
        .into());
    }

    Ok(p)
}

fn duplicate_document(err: sqlx::Error, person: &Person) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.ends_with("document") => {
            DbError::duplicate("CPF/CNPJ", person.document.clone().unwrap_or_default())
        }
        other => other,
    }
}
