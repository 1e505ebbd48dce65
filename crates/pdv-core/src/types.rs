//! # Domain Types
//!
//! Core domain types used throughout Balcão PDV.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Registration          Selling              Money flow                  │
//! │  ─────────────         ─────────────        ─────────────               │
//! │  Product               Sale                 CashSession                 │
//! │  Person (cli/forn)     SaleItem             CashMovement                │
//! │  Employee              Payment              AccountEntry (conta corr.)  │
//! │  Company               PaymentMethod        Title (receber / pagar)     │
//! │  User + PermissionSet                       TitlePayment                │
//! │                                                                         │
//! │  Devices & system: PrinterConfig, Setting, EcommerceAccess              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business key: (code, document, receipt_number, username) - what the
//!   operator types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Internal product code - business identifier.
    pub code: String,

    /// Barcode (EAN-8, EAN-13, UPC-A).
    pub barcode: Option<String>,

    /// Name shown to the cashier and on the receipt.
    pub name: String,

    /// Unit of sale: UN, KG, CX, ...
    pub unit: String,

    /// Sale price in centavos.
    pub price_cents: i64,

    /// Cost in centavos (for margin).
    pub cost_cents: i64,

    /// Current stock level.
    pub stock_quantity: i64,

    /// Stock level that triggers the low-stock report.
    pub min_stock: i64,

    /// Whether sales decrement stock.
    pub track_inventory: bool,

    /// Allow selling past zero stock.
    pub allow_negative_stock: bool,

    /// Soft delete flag.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost as a Money type.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Checks if product can be sold (in stock or doesn't track inventory).
    pub fn can_sell(&self, quantity: i64) -> bool {
        if !self.track_inventory || self.allow_negative_stock {
            return true;
        }
        self.stock_quantity >= quantity
    }

    /// True when a tracked product is at or below its minimum stock.
    pub fn is_below_minimum(&self) -> bool {
        self.track_inventory && self.stock_quantity <= self.min_stock
    }

    /// Gross margin over the sale price, in basis points.
    ///
    /// Price R$ 10,00, cost R$ 6,00 → 4000 (40%). Zero price → 0.
    pub fn margin_bps(&self) -> i64 {
        if self.price_cents <= 0 {
            return 0;
        }
        (self.price_cents - self.cost_cents) * 10_000 / self.price_cents
    }
}

// =============================================================================
// People
// =============================================================================

/// Whether a registered person buys from us, sells to us, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PersonKind {
    Customer,
    Supplier,
    Both,
}

impl PersonKind {
    pub fn is_customer(&self) -> bool {
        matches!(self, PersonKind::Customer | PersonKind::Both)
    }

    pub fn is_supplier(&self) -> bool {
        matches!(self, PersonKind::Supplier | PersonKind::Both)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PersonKind::Customer => "Cliente",
            PersonKind::Supplier => "Fornecedor",
            PersonKind::Both => "Cliente/Fornecedor",
        }
    }
}

/// Postal address. Every field is optional because registrations are often
/// incomplete at the counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Address {
    pub cep: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    /// Two-letter UF.
    pub state: Option<String>,
}

impl Address {
    /// True when no field is filled.
    pub fn is_empty(&self) -> bool {
        [
            &self.cep,
            &self.street,
            &self.number,
            &self.complement,
            &self.district,
            &self.city,
            &self.state,
        ]
        .iter()
        .all(|f| f.as_deref().map_or(true, |s| s.trim().is_empty()))
    }

    /// Single-line rendering: `Rua X, 10 - Centro - Cidade/UF - CEP 01001-000`.
    pub fn one_line(&self) -> String {
        let mut parts = Vec::new();

        let mut street = self.street.clone().unwrap_or_default();
        if let Some(n) = self.number.as_deref().filter(|n| !n.is_empty()) {
            street = format!("{}, {}", street, n);
        }
        if let Some(c) = self.complement.as_deref().filter(|c| !c.is_empty()) {
            street = format!("{} ({})", street, c);
        }
        if !street.trim().is_empty() {
            parts.push(street);
        }
        if let Some(d) = self.district.as_deref().filter(|d| !d.is_empty()) {
            parts.push(d.to_string());
        }
        match (self.city.as_deref(), self.state.as_deref()) {
            (Some(c), Some(uf)) if !c.is_empty() => parts.push(format!("{}/{}", c, uf)),
            (Some(c), _) if !c.is_empty() => parts.push(c.to_string()),
            _ => {}
        }
        if let Some(cep) = self.cep.as_deref().filter(|c| c.len() == 8) {
            parts.push(format!("CEP {}-{}", &cep[..5], &cep[5..]));
        }

        parts.join(" - ")
    }
}

/// A customer and/or supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Person {
    pub id: String,
    pub kind: PersonKind,
    /// Name or legal name (razão social).
    pub name: String,
    /// Trade name (nome fantasia), suppliers mostly.
    pub trade_name: Option<String>,
    /// CPF or CNPJ, digits only.
    pub document: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub address: Address,
    /// Maximum open balance on the current account. Zero means no limit.
    pub credit_limit_cents: i64,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub fn credit_limit(&self) -> Money {
        Money::from_cents(self.credit_limit_cents)
    }

    /// Name to print: trade name when set, legal name otherwise.
    pub fn display_name(&self) -> &str {
        self.trade_name
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

// =============================================================================
// Employees & Company
// =============================================================================

/// A registered employee (funcionário).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: String,
    pub name: String,
    /// Digits only.
    pub cpf: Option<String>,
    /// Job title: "Caixa", "Gerente", ...
    pub role: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hired_on: Option<NaiveDate>,
    pub salary_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The store owner's registration (single row). Printed on receipt headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Company {
    pub id: String,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub cnpj: Option<String>,
    /// Inscrição estadual.
    pub state_registration: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub address: Address,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn display_name(&self) -> &str {
        self.trade_name
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.legal_name)
    }
}

// =============================================================================
// Users & Permissions
// =============================================================================

/// Functional areas an operator can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Products,
    Customers,
    Suppliers,
    Employees,
    Company,
    Sales,
    CashRegister,
    CurrentAccounts,
    Receivables,
    Payables,
    Printing,
    Settings,
    Ecommerce,
}

impl Module {
    pub const ALL: [Module; 13] = [
        Module::Products,
        Module::Customers,
        Module::Suppliers,
        Module::Employees,
        Module::Company,
        Module::Sales,
        Module::CashRegister,
        Module::CurrentAccounts,
        Module::Receivables,
        Module::Payables,
        Module::Printing,
        Module::Settings,
        Module::Ecommerce,
    ];

    /// Stable key, also the database value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Products => "products",
            Module::Customers => "customers",
            Module::Suppliers => "suppliers",
            Module::Employees => "employees",
            Module::Company => "company",
            Module::Sales => "sales",
            Module::CashRegister => "cash_register",
            Module::CurrentAccounts => "current_accounts",
            Module::Receivables => "receivables",
            Module::Payables => "payables",
            Module::Printing => "printing",
            Module::Settings => "settings",
            Module::Ecommerce => "ecommerce",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        Module::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == key)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "módulo".to_string(),
                allowed: Module::ALL.iter().map(|m| m.as_str().to_string()).collect(),
            })
    }
}

/// What an operator may access. Admins implicitly hold every module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub is_admin: bool,
    pub modules: BTreeSet<Module>,
}

impl PermissionSet {
    pub fn admin() -> Self {
        PermissionSet {
            is_admin: true,
            modules: BTreeSet::new(),
        }
    }

    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> Self {
        PermissionSet {
            is_admin: false,
            modules: modules.into_iter().collect(),
        }
    }

    pub fn allows(&self, module: Module) -> bool {
        self.is_admin || self.modules.contains(&module)
    }

    /// Effective modules, expanded for admins.
    pub fn effective(&self) -> Vec<Module> {
        if self.is_admin {
            Module::ALL.to_vec()
        } else {
            self.modules.iter().copied().collect()
        }
    }
}

/// A login account (usuário). May be linked to an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub employee_id: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Sales
// =============================================================================

/// The status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale has been paid and finalized.
    Completed,
    /// Sale was cancelled; stock and money were returned.
    Cancelled,
}

impl SaleStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "concluída",
            SaleStatus::Cancelled => "cancelada",
        }
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash. The only method that can produce change.
    Cash,
    DebitCard,
    CreditCard,
    Pix,
    /// Charged to the customer's current account (fiado).
    StoreCredit,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::DebitCard,
        PaymentMethod::CreditCard,
        PaymentMethod::Pix,
        PaymentMethod::StoreCredit,
    ];

    /// Label printed on receipts.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Dinheiro",
            PaymentMethod::DebitCard => "Cartão de débito",
            PaymentMethod::CreditCard => "Cartão de crédito",
            PaymentMethod::Pix => "PIX",
            PaymentMethod::StoreCredit => "Conta (fiado)",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "dinheiro" => Ok(PaymentMethod::Cash),
            "debit" | "debito" | "débito" | "debit_card" => Ok(PaymentMethod::DebitCard),
            "credit" | "credito" | "crédito" | "credit_card" => Ok(PaymentMethod::CreditCard),
            "pix" => Ok(PaymentMethod::Pix),
            "fiado" | "conta" | "store_credit" => Ok(PaymentMethod::StoreCredit),
            _ => Err(ValidationError::NotAllowed {
                field: "forma de pagamento".to_string(),
                allowed: ["dinheiro", "debito", "credito", "pix", "fiado"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// A finalized (or later cancelled) sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// `YYYYMMDD-NNNN`.
    pub receipt_number: String,
    pub customer_id: Option<String>,
    pub user_id: String,
    pub cash_session_id: Option<String>,
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub change_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

impl Sale {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product code at time of sale (frozen).
    pub code_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in centavos at time of sale (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub discount_cents: i64,
    /// unit_price × quantity - discount.
    pub line_total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A payment towards a sale. A sale can be split across methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub method: PaymentMethod,
    /// Amount applied to the sale.
    pub amount_cents: i64,
    /// What the customer handed over (cash only differs from amount).
    pub tendered_cents: i64,
    /// Change returned (cash only).
    pub change_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Cash Register
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CashStatus {
    Open,
    Closed,
}

/// One opening-to-closing period of the cash drawer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashSession {
    pub id: String,
    pub opened_by: String,
    pub opened_at: DateTime<Utc>,
    pub opening_balance_cents: i64,
    pub closed_by: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    /// What the operator counted when closing.
    pub counted_cents: Option<i64>,
    /// What the movements say should be in the drawer when closing.
    pub expected_cents: Option<i64>,
    pub status: CashStatus,
}

impl CashSession {
    pub fn is_open(&self) -> bool {
        self.status == CashStatus::Open
    }

    /// counted - expected. Positive is surplus, negative is shortage.
    pub fn difference(&self) -> Option<Money> {
        match (self.counted_cents, self.expected_cents) {
            (Some(c), Some(e)) => Some(Money::from_cents(c - e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CashMovementKind {
    Opening,
    /// Cash kept from a sale (tendered minus change).
    Sale,
    /// Suprimento: money put into the drawer.
    Supply,
    /// Sangria: money taken out.
    Withdrawal,
    /// Customer paid an account or receivable in cash.
    Receipt,
    /// Cash returned on a cancelled sale.
    Refund,
}

impl CashMovementKind {
    pub fn label(&self) -> &'static str {
        match self {
            CashMovementKind::Opening => "Abertura",
            CashMovementKind::Sale => "Venda",
            CashMovementKind::Supply => "Suprimento",
            CashMovementKind::Withdrawal => "Sangria",
            CashMovementKind::Receipt => "Recebimento",
            CashMovementKind::Refund => "Estorno",
        }
    }
}

/// A cash drawer movement. `amount_cents` is signed: outflows are negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashMovement {
    pub id: String,
    pub session_id: String,
    pub kind: CashMovementKind,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub sale_id: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Current Account (conta corrente)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Customer owes more (purchase on credit).
    Debit,
    /// Customer owes less (payment, cancelled sale).
    Credit,
}

/// A line in a customer's current account. `amount_cents` is always positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AccountEntry {
    pub id: String,
    pub person_id: String,
    pub kind: EntryKind,
    pub amount_cents: i64,
    pub description: String,
    pub sale_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AccountEntry {
    /// Effect on the balance owed: debits add, credits subtract.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            EntryKind::Debit => Money::from_cents(self.amount_cents),
            EntryKind::Credit => Money::from_cents(-self.amount_cents),
        }
    }
}

// =============================================================================
// Receivables & Payables
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TitleKind {
    /// Contas a receber.
    Receivable,
    /// Contas a pagar.
    Payable,
}

impl TitleKind {
    pub fn label(&self) -> &'static str {
        match self {
            TitleKind::Receivable => "a receber",
            TitleKind::Payable => "a pagar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TitleStatus {
    Open,
    Partial,
    Paid,
    Cancelled,
}

impl TitleStatus {
    /// Status after `paid` of `amount` has been settled.
    pub fn for_paid(paid: i64, amount: i64) -> TitleStatus {
        if paid <= 0 {
            TitleStatus::Open
        } else if paid < amount {
            TitleStatus::Partial
        } else {
            TitleStatus::Paid
        }
    }

    pub fn accepts_payment(&self) -> bool {
        matches!(self, TitleStatus::Open | TitleStatus::Partial)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TitleStatus::Open => "aberto",
            TitleStatus::Partial => "parcial",
            TitleStatus::Paid => "pago",
            TitleStatus::Cancelled => "cancelado",
        }
    }
}

/// A receivable or payable title (duplicata / boleto / conta).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Title {
    pub id: String,
    pub kind: TitleKind,
    pub person_id: Option<String>,
    pub description: String,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub due_date: NaiveDate,
    pub status: TitleStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Title {
    /// What is still owed.
    pub fn open_balance(&self) -> Money {
        Money::from_cents(self.amount_cents - self.paid_cents)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.accepts_payment() && self.due_date < today
    }
}

/// A payment against a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TitlePayment {
    pub id: String,
    pub title_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub user_id: String,
    pub paid_at: DateTime<Utc>,
}

// =============================================================================
// Printers
// =============================================================================

/// Default raw-printing TCP port (JetDirect).
pub const DEFAULT_PRINTER_PORT: u16 = 9100;

/// Where a printer is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PrinterTransportKind {
    /// Raw TCP, usually port 9100.
    Network { host: String, port: u16 },
    /// OS device path: `/dev/usb/lp0`, `COM3`, `\\host\share`.
    Device { path: String },
    /// Spool to a file.
    File { path: String },
}

impl PrinterTransportKind {
    pub fn kind_str(&self) -> &'static str {
        match self {
            PrinterTransportKind::Network { .. } => "network",
            PrinterTransportKind::Device { .. } => "device",
            PrinterTransportKind::File { .. } => "file",
        }
    }
}

impl fmt::Display for PrinterTransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrinterTransportKind::Network { host, port } => write!(f, "tcp://{}:{}", host, port),
            PrinterTransportKind::Device { path } => write!(f, "device:{}", path),
            PrinterTransportKind::File { path } => write!(f, "file:{}", path),
        }
    }
}

impl FromStr for PrinterTransportKind {
    type Err = ValidationError;

    /// Parses `tcp://host[:port]`, `device:<path>` or `file:<path>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("tcp://") {
            let (host, port) = match rest.rsplit_once(':') {
                Some((h, p)) => {
                    let port = p
                        .parse::<u16>()
                        .map_err(|_| ValidationError::invalid("porta", p))?;
                    (h, port)
                }
                None => (rest, DEFAULT_PRINTER_PORT),
            };
            if host.is_empty() {
                return Err(ValidationError::required("host"));
            }
            return Ok(PrinterTransportKind::Network {
                host: host.to_string(),
                port,
            });
        }
        if let Some(path) = s.strip_prefix("device:") {
            if path.is_empty() {
                return Err(ValidationError::required("dispositivo"));
            }
            return Ok(PrinterTransportKind::Device {
                path: path.to_string(),
            });
        }
        if let Some(path) = s.strip_prefix("file:") {
            if path.is_empty() {
                return Err(ValidationError::required("arquivo"));
            }
            return Ok(PrinterTransportKind::File {
                path: path.to_string(),
            });
        }
        Err(ValidationError::invalid(
            "impressora",
            "use tcp://host:porta, device:<caminho> ou file:<caminho>",
        ))
    }
}

/// A configured receipt printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterConfig {
    pub name: String,
    pub transport: PrinterTransportKind,
    /// Characters per line: 48 for 80mm paper, 32 for 58mm.
    pub columns: u16,
    pub cut_paper: bool,
    pub open_drawer: bool,
    pub is_default: bool,
}

impl PrinterConfig {
    pub fn new(name: impl Into<String>, transport: PrinterTransportKind) -> Self {
        PrinterConfig {
            name: name.into(),
            transport,
            columns: 48,
            cut_paper: true,
            open_drawer: false,
            is_default: false,
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// A key/value system setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Whether the e-commerce area is unlocked for this installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcommerceAccess {
    pub enabled: bool,
    pub url: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
