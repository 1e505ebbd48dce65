//! # pdv-db: Database Layer for Balcão PDV
//!
//! This crate provides database access for Balcão PDV.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Balcão PDV Data Flow                             │
//! │                                                                         │
//! │  CLI command (pdv sale checkout)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     pdv-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ products      │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ sales, cash   │    │ 002_settings │  │   │
//! │  │   │               │    │ accounts ...  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (<data dir>/pdv.db)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdv_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pdv.db")).await?;
//! let products = db.products().search("arroz", 20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::account::{AccountRepository, Debtor};
pub use repository::cash::{CashClosing, CashRepository};
pub use repository::company::CompanyRepository;
pub use repository::employee::EmployeeRepository;
pub use repository::person::PersonRepository;
pub use repository::printer::PrinterRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::{DailySummary, NewSale, SaleDetail, SaleFilter, SaleRepository};
pub use repository::settings::{
    SettingsRepository, ECOMMERCE_ENABLED, ECOMMERCE_URL, REQUIRE_OPEN_CASH,
};
pub use repository::title::{NewTitle, TitleFilter, TitleRepository, TitleSettlement};
pub use repository::user::{
    hash_password, verify_password, AuthenticatedUser, UserRepository, DEFAULT_ADMIN_USERNAME,
};
