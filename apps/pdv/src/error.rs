//! # Application Error Type
//!
//! Every command returns `AppResult<T>`. Library errors are converted here
//! into what the operator sees.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Balcão PDV                             │
//! │                                                                         │
//! │  Command Function                                                       │
//! │  Result<T, AppError>                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Database Error? ─── DbError::QueryFailed("...") ───┐                  │
//! │         │                                            │                  │
//! │         ▼                                            ▼                  │
//! │  Business rule? ──── CoreError::InsufficientStock ─ AppError ───┐      │
//! │         │                                                        │      │
//! │         ▼                                                        ▼      │
//! │  Printer / update / lookup ─────────────────────────► stderr + exit   │
//! │                                                        code            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal details (SQL, I/O) are logged with `tracing::error!`; the
//! operator gets a short message in Portuguese.

use serde::Serialize;

use crate::config::ConfigError;
use pdv_core::{CoreError, ValidationError};
use pdv_db::DbError;
use pdv_lookup::LookupError;
use pdv_print::PrintError;
use pdv_update::UpdateError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Message for the operator
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing record
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Business rule rejected the operation
    BusinessLogic,

    /// Login failed or no login given
    Unauthorized,

    /// Logged in, but the module is not granted
    PermissionDenied,

    /// Database operation failed
    DatabaseError,

    /// Printer unreachable or write failed
    PrinterError,

    /// Network service (update, CEP/CNPJ) failed
    NetworkError,

    /// Config file unreadable or invalid
    ConfigError,

    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Process exit status for this code.
    ///
    /// | code              | exit |
    /// |-------------------|------|
    /// | Internal          | 1    |
    /// | ValidationError   | 2    |
    /// | NotFound          | 3    |
    /// | BusinessLogic     | 4    |
    /// | Unauthorized      | 5    |
    /// | PermissionDenied  | 6    |
    /// | DatabaseError     | 7    |
    /// | PrinterError      | 8    |
    /// | NetworkError      | 9    |
    /// | ConfigError       | 10   |
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorCode::Internal => 1,
            ErrorCode::ValidationError => 2,
            ErrorCode::NotFound => 3,
            ErrorCode::BusinessLogic => 4,
            ErrorCode::Unauthorized => 5,
            ErrorCode::PermissionDenied => 6,
            ErrorCode::DatabaseError => 7,
            ErrorCode::PrinterError => 8,
            ErrorCode::NetworkError => 9,
            ErrorCode::ConfigError => 10,
        }
    }
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        AppError::new(ErrorCode::NotFound, format!("{} não encontrado: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    pub fn business(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::BusinessLogic, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.code.exit_code()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AppError::not_found(&entity, &id),
            e @ DbError::UniqueViolation { .. } => AppError::validation(e.to_string()),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                AppError::validation("Referência inválida")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Falha ao abrir o banco de dados")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Falha ao atualizar o banco de dados")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Falha na operação com o banco de dados")
            }
            DbError::PoolExhausted => {
                AppError::new(ErrorCode::DatabaseError, "Banco de dados ocupado, tente novamente")
            }
            e @ DbError::InvalidCredentials => AppError::unauthorized(e.to_string()),
            e @ DbError::InactiveUser(_) => AppError::unauthorized(e.to_string()),
            e @ (DbError::CashAlreadyOpen | DbError::CashNotOpen) => AppError::business(e.to_string()),
            DbError::Rule(core) => core.into(),
            DbError::Corrupt(e) => {
                tracing::error!("Corrupt row: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Dado inválido no banco de dados")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Falha na operação com o banco de dados")
            }
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            e @ CoreError::PermissionDenied(_) => AppError::new(ErrorCode::PermissionDenied, e.to_string()),
            e @ (CoreError::QuantityTooLarge { .. } | CoreError::InvalidPaymentAmount { .. }) => {
                AppError::validation(e.to_string())
            }
            other => AppError::business(other.to_string()),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<PrintError> for AppError {
    fn from(err: PrintError) -> Self {
        match err {
            e @ (PrintError::NoPrinter | PrintError::EmptyDocument) => AppError::business(e.to_string()),
            e => {
                tracing::error!(error = %e, "Printing failed");
                AppError::new(ErrorCode::PrinterError, e.to_string())
            }
        }
    }
}

impl From<UpdateError> for AppError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::Http(e) => {
                tracing::error!(error = %e, "Update request failed");
                AppError::new(ErrorCode::NetworkError, "Falha de rede ao buscar atualização")
            }
            UpdateError::Io { path, source } => {
                tracing::error!(path = %path.display(), error = %source, "Update file error");
                AppError::internal(format!("Falha ao gravar {}", path.display()))
            }
            e @ UpdateError::Config(_) => AppError::new(ErrorCode::ConfigError, e.to_string()),
            e @ (UpdateError::NoRelease | UpdateError::AssetMissing { .. }) => {
                AppError::business(e.to_string())
            }
            e => AppError::new(ErrorCode::NetworkError, e.to_string()),
        }
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidInput(e) => e.into(),
            LookupError::NotFound { what } => AppError::new(ErrorCode::NotFound, format!("{} não encontrado", what)),
            LookupError::Http(e) => {
                tracing::error!(error = %e, "Lookup request failed");
                AppError::new(ErrorCode::NetworkError, "Serviço de consulta indisponível")
            }
            e => AppError::new(ErrorCode::NetworkError, e.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_map_to_codes() {
        let e: AppError = DbError::not_found("Produto", "ARROZ").into();
        assert_eq!(e.code, ErrorCode::NotFound);
        assert_eq!(e.message, "Produto não encontrado: ARROZ");

        let e: AppError = DbError::InvalidCredentials.into();
        assert_eq!(e.code, ErrorCode::Unauthorized);

        let e: AppError = DbError::CashNotOpen.into();
        assert_eq!(e.code, ErrorCode::BusinessLogic);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let e: AppError = DbError::QueryFailed("no such column: x".into()).into();
        assert_eq!(e.code, ErrorCode::DatabaseError);
        assert!(!e.message.contains("column"));
    }

    #[test]
    fn test_rules_pass_through_db() {
        let e: AppError = DbError::Rule(CoreError::EmptyCart).into();
        assert_eq!(e.code, ErrorCode::BusinessLogic);
        assert_eq!(e.message, "O carrinho está vazio");

        let e: AppError = DbError::Rule(ValidationError::required("nome").into()).into();
        assert_eq!(e.code, ErrorCode::ValidationError);

        let e: AppError = CoreError::PermissionDenied("Caixa".into()).into();
        assert_eq!(e.code, ErrorCode::PermissionDenied);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            ErrorCode::Internal,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::BusinessLogic,
            ErrorCode::Unauthorized,
            ErrorCode::PermissionDenied,
            ErrorCode::DatabaseError,
            ErrorCode::PrinterError,
            ErrorCode::NetworkError,
            ErrorCode::ConfigError,
        ];
        let mut seen: Vec<u8> = codes.iter().map(|c| c.exit_code()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), codes.len());
        assert!(!seen.contains(&0));
    }

    #[test]
    fn test_display() {
        let e = AppError::validation("CPF inválido");
        assert_eq!(e.to_string(), "[ValidationError] CPF inválido");
    }
}
