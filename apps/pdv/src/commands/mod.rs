//! # Commands Module
//!
//! One file per command group. Every function takes the state, the
//! operator's session and the parsed arguments, and returns the text to
//! print.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (dispatch, permission gate)
//! ├── user.rs      ◄─── login, users and module grants
//! ├── product.rs   ◄─── products and stock
//! ├── person.rs    ◄─── customers and suppliers
//! ├── employee.rs  ◄─── employees
//! ├── company.rs   ◄─── store registration
//! ├── sale.rs      ◄─── checkout, cancel, reprint, daily summary
//! ├── cash.rs      ◄─── register open/close, supply, withdrawal
//! ├── account.rs   ◄─── current accounts (fiado)
//! ├── title.rs     ◄─── receivables and payables
//! ├── printer.rs   ◄─── receipt printers
//! ├── settings.rs  ◄─── system settings and e-commerce gate
//! ├── lookup.rs    ◄─── CEP / CNPJ lookups
//! ├── update.rs    ◄─── self-update
//! └── config.rs    ◄─── local config file (runs without login)
//! ```
//!
//! ## Permission Gate
//! ```text
//! Command::Cash(..) ──► session.require(Module::CashRegister)?
//!                              │
//!                   denied ◄───┴───► cash::run(state, session, cmd)
//! ```

pub mod account;
pub mod cash;
pub mod company;
pub mod config;
pub mod employee;
pub mod lookup;
pub mod person;
pub mod printer;
pub mod product;
pub mod sale;
pub mod settings;
pub mod title;
pub mod update;
pub mod user;

use crate::cli::Command;
use crate::error::{AppError, AppResult};
use crate::state::{AppState, Session};
use pdv_core::validation::only_digits;
use pdv_core::{Module, Person, PersonKind, Product, TitleKind};

/// Runs a command for a logged-in operator.
pub async fn dispatch(state: &mut AppState, session: &Session, command: Command) -> AppResult<String> {
    match command {
        Command::Login => Ok(user::welcome(session)),
        Command::User(cmd) => user::run(state, session, cmd).await,
        Command::Product(cmd) => {
            session.require(Module::Products)?;
            product::run(state, cmd).await
        }
        Command::Customer(cmd) => {
            session.require(Module::Customers)?;
            person::run(state, PersonKind::Customer, cmd).await
        }
        Command::Supplier(cmd) => {
            session.require(Module::Suppliers)?;
            person::run(state, PersonKind::Supplier, cmd).await
        }
        Command::Employee(cmd) => {
            session.require(Module::Employees)?;
            employee::run(state, cmd).await
        }
        Command::Company(cmd) => {
            session.require(Module::Company)?;
            company::run(state, cmd).await
        }
        Command::Sale(cmd) => {
            session.require(Module::Sales)?;
            sale::run(state, session, cmd).await
        }
        Command::Cash(cmd) => {
            session.require(Module::CashRegister)?;
            cash::run(state, session, cmd).await
        }
        Command::Account(cmd) => {
            session.require(Module::CurrentAccounts)?;
            account::run(state, session, cmd).await
        }
        Command::Receivable(cmd) => {
            session.require(Module::Receivables)?;
            title::run(state, session, TitleKind::Receivable, cmd).await
        }
        Command::Payable(cmd) => {
            session.require(Module::Payables)?;
            title::run(state, session, TitleKind::Payable, cmd).await
        }
        Command::Printer(cmd) => {
            session.require(Module::Printing)?;
            printer::run(state, cmd).await
        }
        Command::Settings(cmd) => {
            session.require(Module::Settings)?;
            settings::run(state, cmd).await
        }
        Command::Ecommerce(cmd) => settings::ecommerce(state, session, cmd).await,
        Command::Lookup(cmd) => {
            // Lookups fill registrations, so any registration module will do
            if ![Module::Customers, Module::Suppliers, Module::Company]
                .into_iter()
                .any(|m| session.allows(m))
            {
                session.require(Module::Customers)?;
            }
            lookup::run(state, cmd).await
        }
        Command::Update(cmd) => {
            session.require(Module::Settings)?;
            update::run(state, cmd).await
        }
        Command::Config(_) => Err(AppError::internal("config runs before login")),
    }
}

// =============================================================================
// Shared lookups
// =============================================================================

/// A registration by id or CPF/CNPJ.
pub(crate) async fn find_person(state: &AppState, key: &str) -> AppResult<Person> {
    let key = key.trim();
    if let Some(person) = state.db().people().get_by_id(key).await? {
        return Ok(person);
    }
    if !only_digits(key).is_empty() {
        if let Some(person) = state.db().people().get_by_document(key).await? {
            return Ok(person);
        }
    }
    Err(AppError::not_found("Cadastro", key))
}

/// A customer by id or CPF/CNPJ.
pub(crate) async fn find_customer(state: &AppState, key: &str) -> AppResult<Person> {
    let person = find_person(state, key).await?;
    if !person.kind.is_customer() {
        return Err(AppError::validation(format!("{} não é cliente", person.name)));
    }
    Ok(person)
}

/// A product by id, barcode or code, active or not.
pub(crate) async fn find_product(state: &AppState, key: &str) -> AppResult<Product> {
    let key = key.trim();
    let products = state.db().products();
    if let Some(p) = products.get_by_id(key).await? {
        return Ok(p);
    }
    if let Some(p) = products.get_by_barcode(key).await? {
        return Ok(p);
    }
    products
        .get_by_code(key)
        .await?
        .ok_or_else(|| AppError::not_found("Produto", key))
}

/// Trims an optional flag value; blank means "clear".
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
