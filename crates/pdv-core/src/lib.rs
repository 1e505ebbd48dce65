//! # pdv-core: Pure Business Logic for Balcão PDV
//!
//! This crate is the **heart** of Balcão PDV. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Balcão PDV Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/pdv (CLI)                               │   │
//! │  │   login ──► sale checkout ──► cash ──► account ──► printer      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pdv-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │ CPF/CNPJ  │  │   │
//! │  │   │  Sale     │  │   R$ fmt  │  │  Tender   │  │ CEP / EAN │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                   ┌───────────┐                 │   │
//! │  │                                   │  version  │                 │   │
//! │  │                                   └───────────┘                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌──────────────┬──────────────┴───┬──────────────┬────────────────┐   │
//! │  │   pdv-db     │    pdv-print     │  pdv-update  │  pdv-lookup    │   │
//! │  └──────────────┴──────────────────┴──────────────┴────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Person, Sale, CashSession, ...)
//! - [`money`] - Money type with integer arithmetic (centavos, no floats)
//! - [`cart`] - In-memory cart and tender rules
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule and document validation
//! - [`version`] - Release version parsing and ordering
//!
//! ## Example Usage
//!
//! ```rust
//! use pdv_core::money::Money;
//!
//! let price = Money::from_cents(123456);
//! assert_eq!(price.to_string(), "R$ 1.234,56");
//!
//! // 10% off
//! let discounted = price.apply_percentage_discount(1000);
//! assert_eq!(discounted.cents(), 111110);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;
pub mod version;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, Discount, Tender, TenderLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use version::Version;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
///
/// ## Business Reason
/// Keeps a single receipt printable on one roll segment and prevents
/// runaway carts from a stuck barcode scanner.
pub const MAX_CART_ITEMS: usize = 200;

/// Maximum quantity of a single item in cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., scanning a barcode into the
/// quantity field).
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum unit price, in centavos (R$ 10.000.000,00).
///
/// ## Business Reason
/// Keeps `price * MAX_ITEM_QUANTITY * MAX_CART_ITEMS` far from `i64` overflow.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Maximum discount allowed on a line or a sale, in basis points (100%).
pub const MAX_DISCOUNT_BPS: u32 = 10_000;

/// Minimum password length for operator accounts.
pub const MIN_PASSWORD_LEN: usize = 4;
