//! # State Module
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  startup::run ──► AppState ──► Session::login ──► commands::dispatch   │
//! │                                                                         │
//! │  ┌──────────────────────────┐      ┌──────────────────────────────┐    │
//! │  │        AppState          │      │          Session             │    │
//! │  │                          │      │                              │    │
//! │  │  • AppConfig (pdv.toml)  │      │  • AuthenticatedUser         │    │
//! │  │  • Database (SQLite pool)│      │  • PermissionSet             │    │
//! │  │  • Company (header)      │      │  • require(Module)           │    │
//! │  └──────────────────────────┘      └──────────────────────────────┘    │
//! │                                                                         │
//! │  AppState is read-only after startup; the pool is shared and           │
//! │  thread-safe. A Session lives for one command invocation.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod app;
mod session;

pub use app::AppState;
pub use session::Session;
