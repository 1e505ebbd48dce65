//! # pdv-lookup: CEP and CNPJ Lookups
//!
//! Inputs are validated locally (CEP shape, CNPJ check digits) before any
//! request, so typos never cost a round trip.
//!
//! ## Modules
//!
//! - [`client`] - `LookupClient` and base URL configuration
//! - [`viacep`] - ViaCEP response parsing
//! - [`brasilapi`] - BrasilAPI CNPJ response parsing
//! - [`error`] - Lookup error types

pub mod brasilapi;
pub mod client;
pub mod error;
pub mod viacep;

pub use brasilapi::CompanyInfo;
pub use client::{LookupClient, LookupConfig, BRASILAPI_URL, VIACEP_URL};
pub use error::{LookupError, LookupResult};
