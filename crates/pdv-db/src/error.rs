//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)         Business rule (CoreError)          │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AppError (apps/pdv) ← code + operator message                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use pdv_core::CoreError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and operator feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID or business key doesn't exist
    #[error("{entity} não encontrado: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate product code or barcode
    /// - Duplicate CPF/CNPJ
    /// - Duplicate username
    #[error("Já existe registro com {field} = '{value}'")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Referência inválida: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Falha ao conectar ao banco de dados: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Falha ao migrar o banco de dados: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Falha na consulta: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Banco de dados ocupado, tente novamente")]
    PoolExhausted,

    /// Wrong username or password. Deliberately does not say which.
    #[error("Usuário ou senha inválidos")]
    InvalidCredentials,

    /// The user (or the employee behind it) is inactive.
    #[error("Usuário {0} está inativo")]
    InactiveUser(String),

    /// A cash session is already open.
    #[error("Já existe um caixa aberto")]
    CashAlreadyOpen,

    /// The operation needs an open cash session.
    #[error("Nenhum caixa aberto")]
    CashNotOpen,

    /// A business rule rejected the write; the transaction was rolled back.
    #[error("{0}")]
    Rule(#[from] CoreError),

    /// Stored data could not be interpreted.
    #[error("Dado inválido no banco: {0}")]
    Corrupt(String),

    /// Internal database error.
    #[error("Erro interno do banco de dados: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl From<pdv_core::ValidationError> for DbError {
    fn from(err: pdv_core::ValidationError) -> Self {
        DbError::Rule(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Registro".to_string(),
                id: "desconhecido".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("desconhecido")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "?".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool fechado".to_string()),

            sqlx::Error::ColumnDecode { index, source } => {
                DbError::Corrupt(format!("coluna {}: {}", index, source))
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_core_error_passes_through() {
        let err: DbError = CoreError::EmptyCart.into();
        assert_eq!(err.to_string(), "O carrinho está vazio");
    }
}
