//! # Command Line
//!
//! ```text
//! pdv [--config <arquivo>] [--db <arquivo>] [-u <usuário>] [-p <senha>] [-v] <grupo> <comando>
//!
//! pdv -u maria -p 1234 cash open 150,00
//! pdv -u maria -p 1234 sale checkout 7891234567895*2 ARROZ-5KG --pay dinheiro:50 --print
//! pdv -u admin -p admin user grant maria sales cash_register
//! ```
//!
//! Money accepts `1.234,56`, `1234,56`, `1234.56` and `R$ 10`. Dates accept
//! `dd/mm/aaaa` and `aaaa-mm-dd`.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use pdv_core::{Discount, Module, Money, PaymentMethod, TitleStatus};

#[derive(Debug, Parser)]
#[command(name = "pdv", version, about = "Balcão PDV: frente de caixa e retaguarda")]
pub struct Cli {
    /// Config file (default: <config_dir>/pdv.toml)
    #[arg(long, global = true, value_name = "ARQUIVO")]
    pub config: Option<PathBuf>,

    /// Database file, overrides the config
    #[arg(long, global = true, value_name = "ARQUIVO")]
    pub db: Option<PathBuf>,

    #[arg(short, long, global = true, env = "PDV_USER", value_name = "USUÁRIO")]
    pub user: Option<String>,

    #[arg(
        short,
        long,
        global = true,
        env = "PDV_PASSWORD",
        hide_env_values = true,
        value_name = "SENHA"
    )]
    pub password: Option<String>,

    /// Debug logging for the pdv crates
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Checks the credentials and lists the granted modules
    Login,
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Product(ProductCommand),
    #[command(subcommand)]
    Customer(PersonCommand),
    #[command(subcommand)]
    Supplier(PersonCommand),
    #[command(subcommand)]
    Employee(EmployeeCommand),
    #[command(subcommand)]
    Company(CompanyCommand),
    #[command(subcommand)]
    Sale(SaleCommand),
    #[command(subcommand)]
    Cash(CashCommand),
    /// Customer current accounts (conta corrente / fiado)
    #[command(subcommand)]
    Account(AccountCommand),
    /// Contas a receber
    #[command(subcommand)]
    Receivable(TitleCommand),
    /// Contas a pagar
    #[command(subcommand)]
    Payable(TitleCommand),
    #[command(subcommand)]
    Printer(PrinterCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Ecommerce(EcommerceCommand),
    /// CEP and CNPJ lookups
    #[command(subcommand)]
    Lookup(LookupCommand),
    #[command(subcommand)]
    Update(UpdateCommand),
    /// Local config file (no login needed)
    #[command(subcommand)]
    Config(ConfigCommand),
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    List,
    Add {
        username: String,
        password: String,
        /// Employee id to link
        #[arg(long)]
        employee: Option<String>,
        #[arg(long)]
        admin: bool,
    },
    /// Changes a password. Operators may change their own.
    Password { username: String, new_password: String },
    Grant {
        username: String,
        #[arg(required = true)]
        modules: Vec<Module>,
    },
    Revoke {
        username: String,
        #[arg(required = true)]
        modules: Vec<Module>,
    },
    Activate { username: String },
    Deactivate { username: String },
}

// =============================================================================
// Registrations
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// By id, code or barcode
    Show { key: String },
    Add(ProductArgs),
    Update {
        key: String,
        #[command(flatten)]
        changes: ProductChanges,
    },
    /// Adds (or with a negative value removes) stock
    Stock {
        key: String,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    Remove { key: String },
    LowStock {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[derive(Debug, Args)]
pub struct ProductArgs {
    pub code: String,
    pub name: String,
    #[arg(value_parser = parse_money)]
    pub price: Money,
    #[arg(long, value_parser = parse_money)]
    pub cost: Option<Money>,
    #[arg(long)]
    pub barcode: Option<String>,
    #[arg(long, default_value = "UN")]
    pub unit: String,
    #[arg(long, default_value_t = 0)]
    pub stock: i64,
    #[arg(long, default_value_t = 0)]
    pub min_stock: i64,
    /// Do not control stock for this product
    #[arg(long)]
    pub no_track: bool,
    /// Allow selling below zero stock
    #[arg(long)]
    pub allow_negative: bool,
}

#[derive(Debug, Default, Args)]
pub struct ProductChanges {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, value_parser = parse_money)]
    pub price: Option<Money>,
    #[arg(long, value_parser = parse_money)]
    pub cost: Option<Money>,
    #[arg(long)]
    pub barcode: Option<String>,
    #[arg(long)]
    pub unit: Option<String>,
    #[arg(long)]
    pub min_stock: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum PersonCommand {
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// By id or CPF/CNPJ
    Show { key: String },
    Add(PersonArgs),
    Update {
        key: String,
        #[command(flatten)]
        changes: PersonChanges,
    },
    Activate { key: String },
    Deactivate { key: String },
}

#[derive(Debug, Args)]
pub struct PersonArgs {
    pub name: String,
    /// CPF or CNPJ
    #[arg(long)]
    pub document: Option<String>,
    #[arg(long)]
    pub trade_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[command(flatten)]
    pub address: AddressArgs,
    /// Store credit limit; 0 means no limit
    #[arg(long, value_parser = parse_money)]
    pub credit_limit: Option<Money>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Registers the person as both customer and supplier
    #[arg(long)]
    pub both: bool,
}

#[derive(Debug, Default, Args)]
pub struct PersonChanges {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub document: Option<String>,
    #[arg(long)]
    pub trade_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[command(flatten)]
    pub address: AddressArgs,
    #[arg(long, value_parser = parse_money)]
    pub credit_limit: Option<Money>,
    #[arg(long)]
    pub notes: Option<String>,
}

/// Address fields. With `--cep` alone the rest is filled from ViaCEP.
#[derive(Debug, Default, Clone, Args)]
pub struct AddressArgs {
    #[arg(long)]
    pub cep: Option<String>,
    #[arg(long)]
    pub street: Option<String>,
    #[arg(long)]
    pub number: Option<String>,
    #[arg(long)]
    pub complement: Option<String>,
    #[arg(long)]
    pub district: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    /// Skip the CEP lookup
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Subcommand)]
pub enum EmployeeCommand {
    List {
        /// Include inactive employees
        #[arg(long)]
        all: bool,
    },
    Add(EmployeeArgs),
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_parser = parse_money)]
        salary: Option<Money>,
    },
    Activate { id: String },
    Deactivate { id: String },
}

#[derive(Debug, Args)]
pub struct EmployeeArgs {
    pub name: String,
    pub role: String,
    #[arg(long)]
    pub cpf: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long, value_parser = parse_date)]
    pub hired_on: Option<NaiveDate>,
    #[arg(long, value_parser = parse_money)]
    pub salary: Option<Money>,
}

#[derive(Debug, Subcommand)]
pub enum CompanyCommand {
    Show,
    Set {
        #[arg(long)]
        legal_name: Option<String>,
        #[arg(long)]
        trade_name: Option<String>,
        #[arg(long)]
        cnpj: Option<String>,
        /// Inscrição estadual
        #[arg(long)]
        ie: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        address: AddressArgs,
    },
    /// Fills the registration from the CNPJ public record
    Fetch { cnpj: String },
}

// =============================================================================
// Sales & cash
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum SaleCommand {
    /// Sells the given items: `CODE`, `BARCODE` or `CODE*QTY`
    Checkout(CheckoutArgs),
    /// By id or receipt number
    Show { key: String },
    List {
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
        /// Customer id or CPF/CNPJ
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        cancelled: bool,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    Cancel { key: String, reason: String },
    Reprint {
        key: String,
        #[arg(long)]
        printer: Option<String>,
    },
    /// Totals of a day (default today)
    Summary {
        #[arg(value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

#[derive(Debug, Args)]
pub struct CheckoutArgs {
    #[arg(required = true, value_parser = parse_item)]
    pub items: Vec<ItemArg>,
    /// `METHOD:AMOUNT`, repeatable. Methods: dinheiro, debito, credito, pix, fiado.
    /// Without it the total is paid in cash.
    #[arg(long = "pay", value_parser = parse_payment)]
    pub payments: Vec<PaymentArg>,
    /// Sale discount: `5,00` or `10%`
    #[arg(long, value_parser = parse_discount)]
    pub discount: Option<Discount>,
    /// Customer id or CPF/CNPJ
    #[arg(long)]
    pub customer: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Prints the receipt on the default printer
    #[arg(long)]
    pub print: bool,
    /// Prints the receipt on this printer
    #[arg(long)]
    pub printer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemArg {
    pub key: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentArg {
    pub method: PaymentMethod,
    pub amount: Money,
}

#[derive(Debug, Subcommand)]
pub enum CashCommand {
    Open {
        #[arg(value_parser = parse_money)]
        opening: Money,
    },
    Status,
    /// Suprimento
    Supply {
        #[arg(value_parser = parse_money)]
        amount: Money,
        description: Option<String>,
    },
    /// Sangria
    Withdraw {
        #[arg(value_parser = parse_money)]
        amount: Money,
        description: Option<String>,
    },
    Close {
        #[arg(value_parser = parse_money)]
        counted: Money,
    },
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    Statement { customer: String },
    /// Customer pays off part of the balance
    Pay {
        customer: String,
        #[arg(value_parser = parse_money)]
        amount: Money,
        #[arg(long, default_value = "dinheiro")]
        method: PaymentMethod,
        #[arg(long)]
        description: Option<String>,
    },
    /// Manual charge, e.g. a balance carried over
    Debit {
        customer: String,
        #[arg(value_parser = parse_money)]
        amount: Money,
        description: String,
    },
    Debtors,
}

#[derive(Debug, Subcommand)]
pub enum TitleCommand {
    List {
        #[arg(long, value_parser = parse_title_status)]
        status: Option<TitleStatus>,
        #[arg(long)]
        overdue: bool,
        /// Person id or CPF/CNPJ
        #[arg(long)]
        person: Option<String>,
    },
    Show { id: String },
    Add {
        description: String,
        #[arg(value_parser = parse_money)]
        amount: Money,
        #[arg(value_parser = parse_date)]
        due: NaiveDate,
        #[arg(long)]
        person: Option<String>,
    },
    Pay {
        id: String,
        #[arg(value_parser = parse_money)]
        amount: Money,
        #[arg(long, default_value = "dinheiro")]
        method: PaymentMethod,
    },
    Cancel { id: String },
}

// =============================================================================
// Devices & system
// =============================================================================

#[derive(Debug, Subcommand)]
pub enum PrinterCommand {
    List,
    /// Adds or replaces a printer. TARGET: tcp://host[:port], device:<path>, file:<path>
    Add {
        name: String,
        target: String,
        #[arg(long, default_value_t = 48)]
        columns: u16,
        #[arg(long)]
        no_cut: bool,
        /// Opens the cash drawer after cash sales
        #[arg(long)]
        drawer: bool,
        #[arg(long)]
        default: bool,
    },
    Default { name: String },
    Remove { name: String },
    Test { name: Option<String> },
    /// Opens the cash drawer
    Drawer { name: Option<String> },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    List,
    Get { key: String },
    Set { key: String, value: String },
}

#[derive(Debug, Subcommand)]
pub enum EcommerceCommand {
    /// Shows the storefront address, if the store has e-commerce
    Open,
    Enable { url: String },
    Disable,
}

#[derive(Debug, Subcommand)]
pub enum LookupCommand {
    Cep { cep: String },
    Cnpj { cnpj: String },
}

#[derive(Debug, Subcommand)]
pub enum UpdateCommand {
    Check,
    /// Downloads the new version and replaces this executable on exit
    Install {
        /// Do not start the new version afterwards
        #[arg(long)]
        no_relaunch: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Prints the effective configuration
    Show,
    /// Writes the effective configuration to the config file
    Init {
        #[arg(long)]
        force: bool,
    },
}

// =============================================================================
// Value parsers
// =============================================================================

pub fn parse_money(s: &str) -> Result<Money, String> {
    Money::parse(s).map_err(|e| e.to_string())
}

/// `dd/mm/aaaa` or `aaaa-mm-dd`.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| format!("data inválida: {} (use dd/mm/aaaa)", s))
}

/// `KEY` or `KEY*QTY`.
pub fn parse_item(s: &str) -> Result<ItemArg, String> {
    let (key, quantity) = match s.rsplit_once('*') {
        Some((key, qty)) => {
            let quantity = qty
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("quantidade inválida em {}", s))?;
            (key, quantity)
        }
        None => (s, 1),
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("item sem código: {}", s));
    }
    Ok(ItemArg {
        key: key.to_string(),
        quantity,
    })
}

/// `METHOD:AMOUNT`.
pub fn parse_payment(s: &str) -> Result<PaymentArg, String> {
    let (method, amount) = s
        .split_once(':')
        .ok_or_else(|| format!("use FORMA:VALOR, recebido {}", s))?;
    Ok(PaymentArg {
        method: method.parse().map_err(|e: pdv_core::ValidationError| e.to_string())?,
        amount: parse_money(amount)?,
    })
}

/// `10%`, `2,5%` or an amount.
pub fn parse_discount(s: &str) -> Result<Discount, String> {
    let s = s.trim();
    if let Some(pct) = s.strip_suffix('%') {
        let pct = pct.trim().replace(',', ".");
        let value: f64 = pct.parse().map_err(|_| format!("percentual inválido: {}", s))?;
        if !(0.0..=100.0).contains(&value) {
            return Err(format!("percentual fora de 0..100: {}", s));
        }
        return Ok(Discount::Percent((value * 100.0).round() as u32));
    }
    Ok(Discount::Amount(parse_money(s)?))
}

pub fn parse_title_status(s: &str) -> Result<TitleStatus, String> {
    match s.trim().to_lowercase().as_str() {
        "aberto" | "open" => Ok(TitleStatus::Open),
        "parcial" | "partial" => Ok(TitleStatus::Partial),
        "pago" | "paid" => Ok(TitleStatus::Paid),
        "cancelado" | "cancelled" => Ok(TitleStatus::Cancelled),
        _ => Err(format!("situação inválida: {} (aberto, parcial, pago, cancelado)", s)),
    }
}
