//! # Cart
//!
//! The in-memory cart used at checkout, and the tender rules that decide how
//! payments settle it.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout                                             │
//! │                                                                         │
//! │  Operator Action          Cart Method             State Change          │
//! │  ───────────────          ───────────             ────────────          │
//! │                                                                         │
//! │  Scan / type code ───────► add() ────────────────► lines.push / qty += │
//! │  Change quantity ────────► set_quantity() ───────► line.qty = n        │
//! │  Line discount ──────────► set_line_discount() ──► line.discount       │
//! │  Sale discount ──────────► set_discount() ───────► discount            │
//! │  Pick customer ──────────► set_customer() ───────► customer_id         │
//! │  Payments ───────────────► tender() ─────────────► Tender (read only)  │
//! │                                                                         │
//! │  Totals: subtotal (gross) - discount (lines + sale) = total            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tender Rules
//! - Payments must cover the total.
//! - Only cash can produce change: non-cash payments may not exceed the total.
//! - Store credit (fiado) needs a customer on the cart.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, Product};
use crate::validation::{validate_cart_size, validate_discount_bps, validate_quantity};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// Product data is frozen when the line is created: a price change in the
/// database does not affect a cart in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub discount_cents: i64,
    /// Stock available when added. `None` when stock does not limit the sale.
    pub available: Option<i64>,
}

impl CartLine {
    fn from_product(product: &Product, quantity: i64) -> Self {
        let available = if product.track_inventory && !product.allow_negative_stock {
            Some(product.stock_quantity)
        } else {
            None
        };
        CartLine {
            product_id: product.id.clone(),
            code: product.code.clone(),
            name: product.name.clone(),
            unit: product.unit.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            discount_cents: 0,
            available,
        }
    }

    /// unit price × quantity.
    pub fn gross(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    /// gross - line discount.
    pub fn total(&self) -> Money {
        self.gross() - self.discount()
    }

    fn check_stock(&self, quantity: i64) -> CoreResult<()> {
        match self.available {
            Some(available) if quantity > available => Err(CoreError::InsufficientStock {
                code: self.code.clone(),
                available,
                requested: quantity,
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Sale-level discount, evaluated against the lines when totals are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Discount {
    #[default]
    None,
    /// Fixed amount off.
    Amount(Money),
    /// Percentage off, in basis points.
    Percent(u32),
}

// =============================================================================
// Cart
// =============================================================================

/// The checkout cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product adds quantity)
/// - Quantity is always in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
/// - A line discount never exceeds the line's gross value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub discount: Discount,
    pub customer_id: Option<String>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds a product or increases its quantity if already present.
    pub fn add(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.check_stock(new_qty)?;
            line.quantity = new_qty;
            return Ok(());
        }

        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: crate::MAX_CART_ITEMS,
        })?;

        let line = CartLine::from_product(product, quantity);
        line.check_stock(quantity)?;
        self.lines.push(line);
        Ok(())
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove(product_id);
        }
        validate_quantity(quantity)?;

        let line = self.line_mut(product_id)?;
        line.check_stock(quantity)?;
        line.quantity = quantity;
        // A smaller line cannot keep a discount larger than itself
        line.discount_cents = line.discount_cents.min(line.gross().cents());
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() == before {
            return Err(CoreError::NotInCart(product_id.to_string()));
        }
        Ok(())
    }

    /// Sets a fixed discount on one line.
    pub fn set_line_discount(&mut self, product_id: &str, discount: Money) -> CoreResult<()> {
        let line = self.line_mut(product_id)?;
        if discount.is_negative() || discount > line.gross() {
            return Err(ValidationError::OutOfRange {
                field: "desconto do item".to_string(),
                min: 0,
                max: line.gross().cents(),
            }
            .into());
        }
        line.discount_cents = discount.cents();
        Ok(())
    }

    /// Sets a percentage discount on one line.
    pub fn set_line_discount_bps(&mut self, product_id: &str, bps: u32) -> CoreResult<()> {
        validate_discount_bps(bps)?;
        let line = self.line_mut(product_id)?;
        line.discount_cents = line.gross().percentage(bps).cents();
        Ok(())
    }

    /// Sets the sale-level discount.
    pub fn set_discount(&mut self, discount: Discount) -> CoreResult<()> {
        match discount {
            Discount::Amount(amount) if amount.is_negative() || amount > self.lines_total() => {
                return Err(ValidationError::OutOfRange {
                    field: "desconto".to_string(),
                    min: 0,
                    max: self.lines_total().cents(),
                }
                .into());
            }
            Discount::Percent(bps) => validate_discount_bps(bps)?,
            _ => {}
        }
        self.discount = discount;
        Ok(())
    }

    pub fn set_customer(&mut self, customer_id: Option<String>) {
        self.customer_id = customer_id;
    }

    pub fn clear(&mut self) {
        *self = Cart::default();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of gross line values (before any discount).
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::gross).sum()
    }

    /// Sum of line totals (after line discounts).
    fn lines_total(&self) -> Money {
        self.lines.iter().map(CartLine::total).sum()
    }

    /// The sale-level discount as an amount, capped at the lines total.
    pub fn sale_discount(&self) -> Money {
        let base = self.lines_total();
        match self.discount {
            Discount::None => Money::zero(),
            Discount::Amount(amount) => amount.min(base),
            Discount::Percent(bps) => base.percentage(bps),
        }
    }

    /// All discounts: lines plus sale.
    pub fn discount_total(&self) -> Money {
        self.lines.iter().map(CartLine::discount).sum::<Money>() + self.sale_discount()
    }

    pub fn total(&self) -> Money {
        self.subtotal() - self.discount_total()
    }

    /// What is still owed after `payments`, never negative.
    pub fn balance_due(&self, payments: &[(PaymentMethod, Money)]) -> Money {
        let paid: Money = payments.iter().map(|(_, m)| *m).sum();
        let due = self.total() - paid;
        if due.is_negative() {
            Money::zero()
        } else {
            due
        }
    }

    /// Settles the cart with the given payments.
    ///
    /// ## Errors
    /// - `EmptyCart`
    /// - `InvalidPaymentAmount` for zero or negative payments
    /// - `StoreCreditWithoutCustomer`
    /// - `ChangeWithoutCash` when non-cash payments exceed the total
    /// - `InsufficientPayment` when payments do not cover the total
    pub fn tender(&self, payments: &[(PaymentMethod, Money)]) -> CoreResult<Tender> {
        if self.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        Tender::settle(self.total(), payments, self.customer_id.is_some())
    }

    fn line_mut(&mut self, product_id: &str) -> CoreResult<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::NotInCart(product_id.to_string()))
    }
}

// =============================================================================
// Tender
// =============================================================================

/// One settled payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderLine {
    pub method: PaymentMethod,
    /// What the customer handed over.
    pub tendered: Money,
    /// Applied to the sale (tendered - change).
    pub amount: Money,
    /// Returned to the customer.
    pub change: Money,
}

/// The outcome of settling a total with a set of payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tender {
    pub lines: Vec<TenderLine>,
    pub total: Money,
    pub paid: Money,
    pub change: Money,
}

impl Tender {
    /// Applies `payments` to `total`. Change is taken from the cash lines,
    /// last first.
    pub fn settle(
        total: Money,
        payments: &[(PaymentMethod, Money)],
        has_customer: bool,
    ) -> CoreResult<Tender> {
        let mut non_cash = Money::zero();
        for (method, amount) in payments {
            if !amount.is_positive() {
                return Err(CoreError::InvalidPaymentAmount {
                    reason: format!("{} deve ser positivo", method.label()),
                });
            }
            if *method == PaymentMethod::StoreCredit && !has_customer {
                return Err(CoreError::StoreCreditWithoutCustomer);
            }
            if *method != PaymentMethod::Cash {
                non_cash += *amount;
            }
        }

        if non_cash > total {
            return Err(CoreError::ChangeWithoutCash);
        }

        let paid: Money = payments.iter().map(|(_, m)| *m).sum();
        if paid < total {
            return Err(CoreError::InsufficientPayment {
                total: total.to_string(),
                paid: paid.to_string(),
            });
        }

        let change = paid - total;
        let mut lines: Vec<TenderLine> = payments
            .iter()
            .map(|(method, amount)| TenderLine {
                method: *method,
                tendered: *amount,
                amount: *amount,
                change: Money::zero(),
            })
            .collect();

        let mut to_return = change;
        for line in lines.iter_mut().rev() {
            if to_return.is_zero() {
                break;
            }
            if line.method != PaymentMethod::Cash {
                continue;
            }
            let part = to_return.min(line.tendered);
            line.change = part;
            line.amount = line.tendered - part;
            to_return -= part;
        }

        Ok(Tender {
            lines,
            total,
            paid,
            change,
        })
    }

    /// Sum applied by one method.
    pub fn amount_for(&self, method: PaymentMethod) -> Money {
        self.lines
            .iter()
            .filter(|l| l.method == method)
            .map(|l| l.amount)
            .sum()
    }

    /// Cash that stays in the drawer (tendered cash minus change).
    pub fn cash_kept(&self) -> Money {
        self.amount_for(PaymentMethod::Cash)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, price_cents: i64, stock: i64, track: bool) -> Product {
        Product {
            id: id.to_string(),
            code: format!("COD-{}", id),
            barcode: None,
            name: format!("Produto {}", id),
            unit: "UN".to_string(),
            price_cents,
            cost_cents: 0,
            stock_quantity: stock,
            min_stock: 0,
            track_inventory: track,
            allow_negative_stock: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cash(cents: i64) -> (PaymentMethod, Money) {
        (PaymentMethod::Cash, Money::from_cents(cents))
    }

    #[test]
    fn test_add_same_product_increases_quantity() {
        let mut cart = Cart::new();
        let p = product("1", 999, 0, false);

        cart.add(&p, 2).unwrap();
        cart.add(&p, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.subtotal().cents(), 4995);
    }

    #[test]
    fn test_add_respects_stock() {
        let mut cart = Cart::new();
        let p = product("1", 500, 3, true);

        cart.add(&p, 2).unwrap();
        let err = cart.add(&p, 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));
        assert!(cart.set_quantity("1", 4).is_err());
        cart.set_quantity("1", 3).unwrap();
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = Cart::new();
        let p = product("1", 100, 0, false);
        assert!(cart.add(&p, 0).is_err());
        cart.add(&p, MAX_ITEM_QUANTITY).unwrap();
        assert!(matches!(
            cart.add(&p, 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = Cart::new();
        for i in 0..crate::MAX_CART_ITEMS {
            cart.add(&product(&i.to_string(), 100, 0, false), 1).unwrap();
        }
        let err = cart.add(&product("extra", 100, 0, false), 1).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(&product("1", 100, 0, false), 2).unwrap();
        cart.set_quantity("1", 0).unwrap();
        assert!(cart.is_empty());
        assert!(matches!(cart.remove("1"), Err(CoreError::NotInCart(_))));
    }

    #[test]
    fn test_discounts() {
        let mut cart = Cart::new();
        cart.add(&product("1", 1000, 0, false), 2).unwrap(); // 20,00
        cart.add(&product("2", 500, 0, false), 1).unwrap(); // 5,00

        cart.set_line_discount("1", Money::from_cents(200)).unwrap();
        assert_eq!(cart.total().cents(), 2300);

        cart.set_discount(Discount::Percent(1000)).unwrap(); // 10% of 23,00
        assert_eq!(cart.sale_discount().cents(), 230);
        assert_eq!(cart.discount_total().cents(), 430);
        assert_eq!(cart.subtotal().cents(), 2500);
        assert_eq!(cart.total().cents(), 2070);

        assert!(cart.set_line_discount("1", Money::from_cents(2001)).is_err());
        assert!(cart.set_discount(Discount::Amount(Money::from_cents(5000))).is_err());
        assert!(cart.set_discount(Discount::Percent(10_001)).is_err());
    }

    #[test]
    fn test_line_discount_clamped_when_quantity_drops() {
        let mut cart = Cart::new();
        cart.add(&product("1", 1000, 0, false), 3).unwrap();
        cart.set_line_discount("1", Money::from_cents(2500)).unwrap();
        cart.set_quantity("1", 2).unwrap();
        assert_eq!(cart.lines[0].discount_cents, 2000);
        assert_eq!(cart.total().cents(), 0);
    }

    #[test]
    fn test_tender_cash_with_change() {
        let mut cart = Cart::new();
        cart.add(&product("1", 4550, 0, false), 1).unwrap();

        let tender = cart.tender(&[cash(5000)]).unwrap();
        assert_eq!(tender.paid.cents(), 5000);
        assert_eq!(tender.change.cents(), 450);
        assert_eq!(tender.lines[0].amount.cents(), 4550);
        assert_eq!(tender.cash_kept().cents(), 4550);
    }

    #[test]
    fn test_tender_split_payment() {
        let mut cart = Cart::new();
        cart.add(&product("1", 10000, 0, false), 1).unwrap();

        let tender = cart
            .tender(&[(PaymentMethod::Pix, Money::from_cents(6000)), cash(5000)])
            .unwrap();
        assert_eq!(tender.change.cents(), 1000);
        assert_eq!(tender.amount_for(PaymentMethod::Pix).cents(), 6000);
        assert_eq!(tender.cash_kept().cents(), 4000);
    }

    #[test]
    fn test_tender_rejections() {
        let mut cart = Cart::new();
        assert!(matches!(cart.tender(&[cash(100)]), Err(CoreError::EmptyCart)));

        cart.add(&product("1", 5000, 0, false), 1).unwrap();

        assert!(matches!(
            cart.tender(&[cash(4000)]),
            Err(CoreError::InsufficientPayment { .. })
        ));
        assert!(matches!(
            cart.tender(&[(PaymentMethod::CreditCard, Money::from_cents(6000))]),
            Err(CoreError::ChangeWithoutCash)
        ));
        assert!(matches!(
            cart.tender(&[(PaymentMethod::StoreCredit, Money::from_cents(5000))]),
            Err(CoreError::StoreCreditWithoutCustomer)
        ));
        assert!(matches!(
            cart.tender(&[cash(0)]),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));

        cart.set_customer(Some("cliente-1".to_string()));
        assert!(cart
            .tender(&[(PaymentMethod::StoreCredit, Money::from_cents(5000))])
            .is_ok());
    }

    #[test]
    fn test_balance_due() {
        let mut cart = Cart::new();
        cart.add(&product("1", 3000, 0, false), 1).unwrap();
        assert_eq!(cart.balance_due(&[cash(1000)]).cents(), 2000);
        assert_eq!(cart.balance_due(&[cash(5000)]).cents(), 0);
    }

    #[test]
    fn test_fully_discounted_sale_needs_no_payment() {
        let mut cart = Cart::new();
        cart.add(&product("1", 3000, 0, false), 1).unwrap();
        cart.set_discount(Discount::Percent(10_000)).unwrap();
        let tender = cart.tender(&[]).unwrap();
        assert!(tender.total.is_zero());
        assert!(tender.change.is_zero());
    }
}
