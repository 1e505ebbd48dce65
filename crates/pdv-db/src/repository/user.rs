//! # User Repository
//!
//! Logins, per-module permissions and authentication.
//!
//! ## Login Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pdv --user maria --password ****  sale checkout ...                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  authenticate("maria", "****")                                          │
//! │       ├── unknown user / wrong password ──► InvalidCredentials          │
//! │       ├── user inactive ─────────────────► InactiveUser                 │
//! │       ├── linked employee inactive ──────► InactiveUser                 │
//! │       └── OK ──► AuthenticatedUser { user, employee, permissions }      │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                 Session::require(Module::Sales)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Passwords are stored as Argon2id PHC strings.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use pdv_core::validation::{validate_password, validate_username};
use pdv_core::{Employee, Module, PermissionSet, User};

const COLUMNS: &str =
    "id, username, password_hash, employee_id, is_admin, is_active, created_at, last_login_at";

/// Username created on first run when no login exists.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// A successfully logged-in operator.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user: User,
    pub employee: Option<Employee>,
    pub permissions: PermissionSet,
}

impl AuthenticatedUser {
    /// Employee name when linked, username otherwise.
    pub fn display_name(&self) -> &str {
        self.employee
            .as_ref()
            .map(|e| e.name.as_str())
            .unwrap_or(&self.user.username)
    }
}

// =============================================================================
// Password Hashing
// =============================================================================

#[cfg(not(test))]
fn hasher() -> DbResult<Argon2<'static>> {
    Ok(Argon2::default())
}

// Cheap parameters keep the test suite fast; verification reads the
// parameters from the stored hash either way.
#[cfg(test)]
fn hasher() -> DbResult<Argon2<'static>> {
    let params = argon2::Params::new(1024, 1, 1, None)
        .map_err(|e| DbError::Internal(format!("argon2 params: {}", e)))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Falha ao gerar hash de senha: {}", e)))?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a login. The username is lowercased.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        employee_id: Option<&str>,
        is_admin: bool,
    ) -> DbResult<User> {
        let username = validate_username(username)?;
        validate_password(password)?;

        let user = User {
            id: new_id(),
            username,
            password_hash: hash_password(password)?,
            employee_id: employee_id.map(str::to_string),
            is_admin,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };

        debug!(username = %user.username, "Creating user");

        let sql = format!("INSERT INTO users ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)");
        sqlx::query(&sql)
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.employee_id)
            .bind(user.is_admin)
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(user.last_login_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("usuário", &user.username),
                other => other,
            })?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = ?1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE username = ?1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users ORDER BY username");
        Ok(sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Checks credentials and loads the operator's employee and permissions.
    pub async fn authenticate(&self, username: &str, password: &str) -> DbResult<AuthenticatedUser> {
        let user = match self.get_by_username(username).await? {
            Some(u) => u,
            None => {
                warn!(username = %username, "Login attempt for unknown user");
                return Err(DbError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(username = %user.username, "Login attempt with wrong password");
            return Err(DbError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(DbError::InactiveUser(user.username));
        }

        let employee = match &user.employee_id {
            Some(id) => {
                let sql = "SELECT id, name, cpf, role, phone, email, hired_on, salary_cents, \
                           is_active, created_at, updated_at FROM employees WHERE id = ?1";
                sqlx::query_as::<_, Employee>(sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        if matches!(&employee, Some(e) if !e.is_active) {
            return Err(DbError::InactiveUser(user.username));
        }

        let permissions = self.permissions(&user.id).await?;

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login_at = ?2 WHERE id = ?1")
            .bind(&user.id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        info!(username = %user.username, admin = user.is_admin, "User logged in");

        Ok(AuthenticatedUser {
            user: User {
                last_login_at: Some(now),
                ..user
            },
            employee,
            permissions,
        })
    }

    pub async fn set_password(&self, id: &str, password: &str) -> DbResult<()> {
        validate_password(password)?;
        let hash = hash_password(password)?;
        let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Usuário", id));
        }
        Ok(())
    }

    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Usuário", id));
        }
        Ok(())
    }

    pub async fn set_admin(&self, id: &str, admin: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_admin = ?2 WHERE id = ?1")
            .bind(id)
            .bind(admin)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Usuário", id));
        }
        Ok(())
    }

    /// Grants a module. Granting twice is a no-op.
    pub async fn grant(&self, id: &str, module: Module) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO user_permissions (user_id, module) VALUES (?1, ?2)")
            .bind(id)
            .bind(module)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn revoke(&self, id: &str, module: Module) -> DbResult<()> {
        sqlx::query("DELETE FROM user_permissions WHERE user_id = ?1 AND module = ?2")
            .bind(id)
            .bind(module)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The user's permission set; admins hold every module.
    pub async fn permissions(&self, id: &str) -> DbResult<PermissionSet> {
        let is_admin: Option<bool> = sqlx::query_scalar("SELECT is_admin FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match is_admin {
            None => Err(DbError::not_found("Usuário", id)),
            Some(true) => Ok(PermissionSet::admin()),
            Some(false) => {
                let modules: Vec<Module> =
                    sqlx::query_scalar("SELECT module FROM user_permissions WHERE user_id = ?1")
                        .bind(id)
                        .fetch_all(&self.pool)
                        .await?;
                Ok(PermissionSet::from_modules(modules))
            }
        }
    }

    /// First-run bootstrap: creates an admin login when no user exists.
    ///
    /// Returns the created user, or `None` when logins already exist.
    pub async fn ensure_admin(&self, initial_password: &str) -> DbResult<Option<User>> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(None);
        }

        let user = self
            .create(DEFAULT_ADMIN_USERNAME, initial_password, None, true)
            .await?;
        warn!(
            username = %user.username,
            "No users found; created the initial administrator. Change its password."
        );
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::employee;
    use crate::repository::testing;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("segredo").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("segredo", &hash));
        assert!(!verify_password("errado", &hash));
        assert!(!verify_password("segredo", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let db = testing::db().await;
        db.users().create("Maria", "1234", None, false).await.unwrap();

        let auth = db.users().authenticate("maria", "1234").await.unwrap();
        assert_eq!(auth.user.username, "maria");
        assert!(auth.user.last_login_at.is_some());
        assert!(auth.user.password_hash.starts_with("$argon2"));

        assert!(matches!(
            db.users().authenticate("maria", "0000").await,
            Err(DbError::InvalidCredentials)
        ));
        assert!(matches!(
            db.users().authenticate("ninguem", "1234").await,
            Err(DbError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_inactive_user_and_employee() {
        let db = testing::db().await;
        let emp = employee::sample("Carlos");
        db.employees().insert(&emp).await.unwrap();
        let user = db
            .users()
            .create("carlos", "1234", Some(&emp.id), false)
            .await
            .unwrap();

        let auth = db.users().authenticate("carlos", "1234").await.unwrap();
        assert_eq!(auth.display_name(), "Carlos");

        db.employees().set_active(&emp.id, false).await.unwrap();
        assert!(matches!(
            db.users().authenticate("carlos", "1234").await,
            Err(DbError::InactiveUser(_))
        ));

        db.employees().set_active(&emp.id, true).await.unwrap();
        db.users().set_active(&user.id, false).await.unwrap();
        assert!(matches!(
            db.users().authenticate("carlos", "1234").await,
            Err(DbError::InactiveUser(_))
        ));
    }

    #[tokio::test]
    async fn test_permissions() {
        let db = testing::db().await;
        let user = db.users().create("caixa1", "1234", None, false).await.unwrap();

        db.users().grant(&user.id, Module::Sales).await.unwrap();
        db.users().grant(&user.id, Module::Sales).await.unwrap();
        db.users().grant(&user.id, Module::CashRegister).await.unwrap();
        db.users().revoke(&user.id, Module::CashRegister).await.unwrap();

        let perms = db.users().permissions(&user.id).await.unwrap();
        assert!(perms.allows(Module::Sales));
        assert!(!perms.allows(Module::CashRegister));

        db.users().set_admin(&user.id, true).await.unwrap();
        assert!(db
            .users()
            .permissions(&user.id)
            .await
            .unwrap()
            .allows(Module::Settings));
    }

    #[tokio::test]
    async fn test_ensure_admin_only_once() {
        let db = testing::db().await;
        let created = db.users().ensure_admin("admin").await.unwrap();
        assert_eq!(created.unwrap().username, DEFAULT_ADMIN_USERNAME);
        assert!(db.users().ensure_admin("admin").await.unwrap().is_none());

        let auth = db.users().authenticate("admin", "admin").await.unwrap();
        assert!(auth.permissions.is_admin);
    }

    #[tokio::test]
    async fn test_set_password_and_duplicates() {
        let db = testing::db().await;
        let user = db.users().create("joao", "1234", None, false).await.unwrap();
        db.users().set_password(&user.id, "nova-senha").await.unwrap();
        assert!(db.users().authenticate("joao", "nova-senha").await.is_ok());

        assert!(matches!(
            db.users().create("JOAO", "1234", None, false).await,
            Err(DbError::UniqueViolation { .. })
        ));
        assert!(matches!(
            db.users().set_password(&user.id, "12").await,
            Err(DbError::Rule(_))
        ));
    }
}
