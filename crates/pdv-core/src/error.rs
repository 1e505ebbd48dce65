//! # Error Types
//!
//! Domain-specific error types for pdv-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pdv-core errors (this file)                                           │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  pdv-db / pdv-print / pdv-update / pdv-lookup                          │
//! │  └── DbError, PrintError, UpdateError, LookupError                      │
//! │                                                                         │
//! │  apps/pdv                                                               │
//! │  └── AppError         - What the operator sees (code + message)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → AppError → terminal               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are caught by the
/// application and translated to operator-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Insufficient stock to complete sale.
    ///
    /// ## When This Occurs
    /// - Selling more than available stock
    /// - Product has track_inventory=true and allow_negative_stock=false
    #[error("Estoque insuficiente para {code}: disponível {available}, solicitado {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// Cart has exceeded maximum allowed lines.
    #[error("O carrinho não pode ter mais de {max} itens")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantidade {requested} excede o máximo permitido ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Product is not in the cart.
    #[error("Produto {0} não está no carrinho")]
    NotInCart(String),

    /// Cart has no lines.
    #[error("O carrinho está vazio")]
    EmptyCart,

    /// Payments do not cover the total.
    #[error("Pagamento insuficiente: total {total}, pago {paid}")]
    InsufficientPayment { total: String, paid: String },

    /// A non-cash payment would produce change.
    ///
    /// ## User Workflow
    /// ```text
    /// Total R$ 50,00
    ///   Card R$ 60,00  ──► rejected (card cannot give change)
    ///   Cash R$ 60,00  ──► accepted, change R$ 10,00
    /// ```
    #[error("Somente dinheiro pode gerar troco")]
    ChangeWithoutCash,

    /// Store credit was used without a customer.
    #[error("Venda a prazo exige um cliente")]
    StoreCreditWithoutCustomer,

    /// A store-credit purchase would push the customer past their limit.
    #[error("Limite de crédito excedido: limite {limit}, saldo após a compra {balance}")]
    CreditLimitExceeded { limit: String, balance: String },

    /// A withdrawal is larger than the cash in the drawer.
    #[error("Saldo em caixa insuficiente: disponível {available}, solicitado {requested}")]
    InsufficientCash { available: String, requested: String },

    /// Payment amount is invalid.
    #[error("Valor de pagamento inválido: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// The entity is not in a state that allows the operation.
    #[error("{entity} {id} está {status}, operação não permitida")]
    InvalidStatus {
        entity: String,
        id: String,
        status: String,
    },

    /// Operator lacks permission for a module.
    #[error("Acesso negado ao módulo {0}")]
    PermissionDenied(String),

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} é obrigatório")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} deve ter pelo menos {min} caracteres")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} deve ter no máximo {max} caracteres")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} deve estar entre {min} e {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} deve ser positivo")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid CPF, invalid date).
    #[error("{field} inválido: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} deve ser um de: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Creates a Required error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
