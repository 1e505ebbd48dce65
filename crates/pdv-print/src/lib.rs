//! # pdv-print: Thermal Receipt Printing
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Print Pipeline                                 │
//! │                                                                         │
//! │  Sale + items + payments + Company                                      │
//! │          │                                                              │
//! │          ▼                                                              │
//! │     ┌─────────┐   ReceiptLayout    ┌─────────┐   PrinterTransport       │
//! │     │ Receipt │ ─────────────────► │ EscPos  │ ──────────────────►  🖨  │
//! │     └─────────┘   (32/48 cols)     └─────────┘   tcp / device / file    │
//! │          │                                                              │
//! │          └──► render_text() ──► terminal preview                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`escpos`] - ESC/POS command builder and CP860 transcoding
//! - [`receipt`] - Receipt data and fixed-width layout
//! - [`transport`] - TCP, device and file delivery with timeouts
//! - [`printer`] - A configured printer tying the above together
//! - [`error`] - Print error types

pub mod error;
pub mod escpos;
pub mod printer;
pub mod receipt;
pub mod transport;

pub use error::{PrintError, PrintResult};
pub use escpos::{Align, CodePage, EscPos};
pub use printer::Printer;
pub use receipt::{Receipt, ReceiptItem, ReceiptLayout, ReceiptPayment};
pub use transport::PrinterTransport;
