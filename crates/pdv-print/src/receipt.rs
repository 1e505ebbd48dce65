//! # Receipt Model and Layout
//!
//! A [`Receipt`] is plain data collected from a finished sale. A
//! [`ReceiptLayout`] turns it into fixed-width lines for the paper roll,
//! either as text (preview, file spool) or as ESC/POS bytes.
//!
//! ```text
//!            MERCADINHO BOA VISTA              ← bold, double size
//!      Comercial Boa Vista Ltda - ME
//!         CNPJ 11.222.333/0001-81
//!   Rua das Flores, 10 - Centro - São Paulo/SP
//! ------------------------------------------------
//!               CUPOM NÃO FISCAL
//! Nº 20240315-0007                16/03/2024 09:41
//! Operador: Maria
//! ------------------------------------------------
//! MERC-0001 Arroz Branco 5kg
//!   2 x R$ 25,90                         R$ 51,80
//! ------------------------------------------------
//! Subtotal                               R$ 51,80
//! Desconto                               -R$ 1,80
//! TOTAL                                  R$ 50,00  ← bold
//! Dinheiro                               R$ 60,00
//! Troco                                  R$ 10,00
//! ------------------------------------------------
//!              Obrigado, volte sempre!
//! ```

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::escpos::{Align, EscPos};
use pdv_core::validation::format_document;
use pdv_core::{Company, Money, Payment, PaymentMethod, Sale, SaleItem};

/// Store name used when no company is registered.
pub const FALLBACK_STORE_NAME: &str = "Balcão PDV";

/// Printed at the bottom when nothing else is configured.
pub const DEFAULT_FOOTER: &str = "Obrigado, volte sempre!";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptItem {
    pub code: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptPayment {
    pub method: PaymentMethod,
    pub label: String,
    pub amount: Money,
}

/// Everything printed on a sale receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub store_name: String,
    /// Legal name, CNPJ, address and phone, one per line.
    pub header_lines: Vec<String>,
    pub receipt_number: String,
    pub issued_at: DateTime<Local>,
    pub operator: Option<String>,
    pub customer: Option<String>,
    pub items: Vec<ReceiptItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    /// What the customer handed over, per method.
    pub payments: Vec<ReceiptPayment>,
    pub change: Money,
    pub footer: Vec<String>,
    pub cancelled: bool,
}

impl Receipt {
    /// Collects a receipt from a stored sale.
    pub fn from_sale(
        company: Option<&Company>,
        sale: &Sale,
        items: &[SaleItem],
        payments: &[Payment],
    ) -> Self {
        let (store_name, header_lines) = match company {
            Some(c) => (c.display_name().to_string(), company_lines(c)),
            None => (FALLBACK_STORE_NAME.to_string(), Vec::new()),
        };

        Receipt {
            store_name,
            header_lines,
            receipt_number: sale.receipt_number.clone(),
            issued_at: sale.created_at.with_timezone(&Local),
            operator: None,
            customer: None,
            items: items
                .iter()
                .map(|i| ReceiptItem {
                    code: i.code_snapshot.clone(),
                    name: i.name_snapshot.clone(),
                    quantity: i.quantity,
                    unit_price: Money::from_cents(i.unit_price_cents),
                    discount: Money::from_cents(i.discount_cents),
                    total: Money::from_cents(i.line_total_cents),
                })
                .collect(),
            subtotal: Money::from_cents(sale.subtotal_cents),
            discount: Money::from_cents(sale.discount_cents),
            total: Money::from_cents(sale.total_cents),
            payments: payments
                .iter()
                .map(|p| ReceiptPayment {
                    method: p.method,
                    label: p.method.label().to_string(),
                    amount: Money::from_cents(p.tendered_cents.max(p.amount_cents)),
                })
                .collect(),
            change: Money::from_cents(sale.change_cents),
            footer: vec![DEFAULT_FOOTER.to_string()],
            cancelled: sale.is_cancelled(),
        }
    }

    pub fn with_store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    /// Replaces the footer. Blank input keeps no footer at all.
    pub fn with_footer(mut self, footer: &str) -> Self {
        self.footer = footer
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        self
    }

    /// True when a cash payment was made, which is when the drawer opens.
    pub fn has_cash(&self) -> bool {
        self.payments.iter().any(|p| p.method == PaymentMethod::Cash)
    }
}

fn company_lines(company: &Company) -> Vec<String> {
    let mut lines = Vec::new();
    if company.display_name() != company.legal_name {
        lines.push(company.legal_name.clone());
    }
    if let Some(cnpj) = company.cnpj.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("CNPJ {}", format_document(cnpj)));
    }
    if let Some(ie) = company.state_registration.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("IE {}", ie));
    }
    if !company.address.is_empty() {
        lines.push(company.address.one_line());
    }
    if let Some(phone) = company.phone.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("Fone {}", phone));
    }
    lines
}

// =============================================================================
// Layout
// =============================================================================

/// Smallest width a receipt can be laid out on.
pub const MIN_COLUMNS: usize = 24;

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Text {
        text: String,
        align: Align,
        bold: bool,
        double: bool,
    },
    /// Left text, right-aligned value.
    Pair {
        left: String,
        right: String,
        bold: bool,
    },
    Rule,
}

impl Block {
    fn left(text: impl Into<String>) -> Self {
        Block::Text {
            text: text.into(),
            align: Align::Left,
            bold: false,
            double: false,
        }
    }

    fn center(text: impl Into<String>) -> Self {
        Block::Text {
            text: text.into(),
            align: Align::Center,
            bold: false,
            double: false,
        }
    }

    fn pair(left: impl Into<String>, right: impl Into<String>) -> Self {
        Block::Pair {
            left: left.into(),
            right: right.into(),
            bold: false,
        }
    }
}

/// Fixed-width receipt renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptLayout {
    pub columns: usize,
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        ReceiptLayout { columns: 48 }
    }
}

impl ReceiptLayout {
    pub fn new(columns: usize) -> Self {
        ReceiptLayout {
            columns: columns.max(MIN_COLUMNS),
        }
    }

    fn blocks(&self, receipt: &Receipt) -> Vec<Block> {
        let mut out = vec![Block::Text {
            text: receipt.store_name.clone(),
            align: Align::Center,
            bold: true,
            double: true,
        }];
        out.extend(receipt.header_lines.iter().cloned().map(Block::center));
        out.push(Block::Rule);

        out.push(Block::center("CUPOM NÃO FISCAL"));
        if receipt.cancelled {
            out.push(Block::Text {
                text: "*** VENDA CANCELADA ***".to_string(),
                align: Align::Center,
                bold: true,
                double: false,
            });
        }
        out.push(Block::pair(
            format!("Nº {}", receipt.receipt_number),
            receipt.issued_at.format("%d/%m/%Y %H:%M").to_string(),
        ));
        if let Some(op) = &receipt.operator {
            out.push(Block::left(format!("Operador: {}", op)));
        }
        if let Some(customer) = &receipt.customer {
            out.push(Block::left(format!("Cliente: {}", customer)));
        }
        out.push(Block::Rule);

        for item in &receipt.items {
            out.push(Block::left(format!("{} {}", item.code, item.name)));
            out.push(Block::pair(
                format!("  {} x {}", item.quantity, item.unit_price),
                item.total.to_string(),
            ));
            if item.discount.is_positive() {
                out.push(Block::pair("  desconto", (-item.discount).to_string()));
            }
        }
        out.push(Block::Rule);

        if receipt.discount.is_positive() {
            out.push(Block::pair("Subtotal", receipt.subtotal.to_string()));
            out.push(Block::pair("Desconto", (-receipt.discount).to_string()));
        }
        out.push(Block::Pair {
            left: "TOTAL".to_string(),
            right: receipt.total.to_string(),
            bold: true,
        });
        for p in &receipt.payments {
            out.push(Block::pair(p.label.clone(), p.amount.to_string()));
        }
        if receipt.change.is_positive() {
            out.push(Block::pair("Troco", receipt.change.to_string()));
        }

        if !receipt.footer.is_empty() {
            out.push(Block::Rule);
            out.extend(receipt.footer.iter().cloned().map(Block::center));
        }
        out
    }

    /// Renders to plain lines, none wider than `columns` characters.
    pub fn render_text(&self, receipt: &Receipt) -> Vec<String> {
        let mut lines = Vec::new();
        for block in self.blocks(receipt) {
            match block {
                Block::Text {
                    text, align, double, ..
                } => {
                    let width = if double { self.columns / 2 } else { self.columns };
                    for part in wrap(&text, width) {
                        lines.push(self.aligned(&part, align));
                    }
                }
                Block::Pair { left, right, .. } => lines.extend(self.pair(&left, &right)),
                Block::Rule => lines.push("-".repeat(self.columns)),
            }
        }
        lines
    }

    /// Appends the receipt as ESC/POS commands. Alignment of text blocks is
    /// left to the printer; pairs are padded here.
    pub fn write_escpos(&self, out: &mut EscPos, receipt: &Receipt) {
        for block in self.blocks(receipt) {
            match block {
                Block::Text {
                    text,
                    align,
                    bold,
                    double,
                } => {
                    let width = if double { self.columns / 2 } else { self.columns };
                    out.align(align).bold(bold).double_size(double);
                    for part in wrap(&text, width) {
                        out.line(&part);
                    }
                    out.double_size(false).bold(false).align(Align::Left);
                }
                Block::Pair { left, right, bold } => {
                    out.bold(bold);
                    for line in self.pair(&left, &right) {
                        out.line(&line);
                    }
                    out.bold(false);
                }
                Block::Rule => {
                    out.line(&"-".repeat(self.columns));
                }
            }
        }
    }

    /// Complete printable document without cut or drawer commands.
    pub fn render_escpos(&self, receipt: &Receipt) -> Vec<u8> {
        let mut out = EscPos::new();
        out.init();
        self.write_escpos(&mut out, receipt);
        out.finish()
    }

    fn aligned(&self, text: &str, align: Align) -> String {
        let len = text.chars().count();
        let pad = self.columns.saturating_sub(len);
        match align {
            Align::Left => text.to_string(),
            Align::Center => format!("{}{}", " ".repeat(pad / 2), text),
            Align::Right => format!("{}{}", " ".repeat(pad), text),
        }
    }

    /// Left text and right-aligned value on one line, or on two lines when
    /// they do not fit together.
    fn pair(&self, left: &str, right: &str) -> Vec<String> {
        let left_len = left.chars().count();
        let right_len = right.chars().count();
        if left_len + 1 + right_len <= self.columns {
            let pad = self.columns - left_len - right_len;
            return vec![format!("{}{}{}", left, " ".repeat(pad), right)];
        }
        let mut lines = wrap(left, self.columns);
        lines.extend(
            wrap(right, self.columns)
                .into_iter()
                .map(|r| self.aligned(&r, Align::Right)),
        );
        lines
    }
}

/// Word-wraps `text` to `width` characters, hard-splitting longer words.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pdv_core::{Address, SaleStatus};

    pub(crate) fn sample() -> Receipt {
        let created = Utc.with_ymd_and_hms(2024, 3, 16, 12, 41, 0).unwrap();
        let sale = Sale {
            id: "s1".to_string(),
            receipt_number: "20240316-0007".to_string(),
            customer_id: None,
            user_id: "u1".to_string(),
            cash_session_id: None,
            status: SaleStatus::Completed,
            subtotal_cents: 5_180,
            discount_cents: 180,
            total_cents: 5_000,
            paid_cents: 6_000,
            change_cents: 1_000,
            notes: None,
            created_at: created,
            cancelled_at: None,
            cancel_reason: None,
        };
        let items = vec![SaleItem {
            id: "i1".to_string(),
            sale_id: "s1".to_string(),
            product_id: "p1".to_string(),
            code_snapshot: "MERC-0001".to_string(),
            name_snapshot: "Arroz Branco 5kg".to_string(),
            unit_price_cents: 2_590,
            quantity: 2,
            discount_cents: 0,
            line_total_cents: 5_180,
        }];
        let payments = vec![Payment {
            id: "pg1".to_string(),
            sale_id: "s1".to_string(),
            method: PaymentMethod::Cash,
            amount_cents: 5_000,
            tendered_cents: 6_000,
            change_cents: 1_000,
            created_at: created,
        }];
        let company = Company {
            id: "c".to_string(),
            legal_name: "Comercial Boa Vista Ltda".to_string(),
            trade_name: Some("Mercadinho Boa Vista".to_string()),
            cnpj: Some("11222333000181".to_string()),
            state_registration: None,
            phone: None,
            email: None,
            address: Address {
                street: Some("Rua das Flores".to_string()),
                number: Some("10".to_string()),
                city: Some("São Paulo".to_string()),
                state: Some("SP".to_string()),
                ..Default::default()
            },
            updated_at: created,
        };
        Receipt::from_sale(Some(&company), &sale, &items, &payments).with_operator("Maria")
    }

    #[test]
    fn test_from_sale() {
        let r = sample();
        assert_eq!(r.store_name, "Mercadinho Boa Vista");
        assert_eq!(r.header_lines[0], "Comercial Boa Vista Ltda");
        assert!(r.header_lines[1].starts_with("CNPJ 11.222.333/0001-81"));
        assert_eq!(r.payments[0].amount, Money::from_cents(6_000));
        assert_eq!(r.change, Money::from_cents(1_000));
        assert!(r.has_cash());
        assert!(!r.cancelled);
    }

    #[test]
    fn test_text_fits_width() {
        for cols in [32usize, 48] {
            let lines = ReceiptLayout::new(cols).render_text(&sample());
            assert!(lines.iter().all(|l| l.chars().count() <= cols), "{:?}", lines);
        }
    }

    #[test]
    fn test_text_content() {
        let lines = ReceiptLayout::new(48).render_text(&sample());
        let total = lines.iter().find(|l| l.starts_with("TOTAL")).unwrap();
        assert!(total.ends_with("R$ 50,00"));
        assert_eq!(total.chars().count(), 48);
        assert!(lines.iter().any(|l| l.starts_with("Desconto") && l.ends_with("-R$ 1,80")));
        assert!(lines.iter().any(|l| l.starts_with("Troco") && l.ends_with("R$ 10,00")));
        assert!(lines.iter().any(|l| l.contains("2 x R$ 25,90")));
        assert!(lines.iter().any(|l| l == "Operador: Maria"));
        assert!(lines.iter().any(|l| l.trim() == DEFAULT_FOOTER));
    }

    #[test]
    fn test_cancelled_banner_and_blank_footer() {
        let mut r = sample().with_footer("  ");
        r.cancelled = true;
        let lines = ReceiptLayout::new(32).render_text(&r);
        assert!(lines.iter().any(|l| l.contains("VENDA CANCELADA")));
        assert!(!lines.iter().any(|l| l.contains(DEFAULT_FOOTER)));
    }

    #[test]
    fn test_escpos_starts_with_init() {
        let bytes = ReceiptLayout::default().render_escpos(&sample());
        assert_eq!(&bytes[..5], &[0x1B, b'@', 0x1B, b't', 3]);
        // "NÃO" transcoded
        assert!(bytes.windows(3).any(|w| w == [b'N', 0x8E, b'O']));
    }

    #[test]
    fn test_narrow_pair_splits() {
        let layout = ReceiptLayout::new(24);
        let lines = layout.pair("Nº 20240316-0007", "16/03/2024 09:41");
        assert_eq!(lines[0], "Nº 20240316-0007");
        assert_eq!(lines[1], "        16/03/2024 09:41");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("abc def ghi", 7), vec!["abc def", "ghi"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10), vec![""]);
    }
}
