//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos                                         │
//! │    R$ 10,00 → 1000 centavos                                             │
//! │    Every sum, discount and change is exact integer math                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Brazilian Formatting
//! Values are displayed as `R$ 1.234,56`: dot groups thousands, comma
//! separates centavos. [`Money::parse`] accepts what an operator types:
//! `1.234,56`, `1234,56`, `1234.56`, `R$ 10`.
//!
//! ## Usage
//! ```rust
//! use pdv_core::money::Money;
//!
//! let price = Money::from_cents(1099); // R$ 10,99
//! let total = price * 3;
//! assert_eq!(total.to_string(), "R$ 32,97");
//!
//! let typed = Money::parse("1.234,56").unwrap();
//! assert_eq!(typed.cents(), 123456);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in centavos.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and withdrawals
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serde transparent**: Serialized as a plain integer
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_cents ──► CartLine.unit_price ──► CartLine.total        │
/// │                                                                         │
/// │  Cart.total ──► Tender (cash/card/pix/fiado) ──► change                │
/// │                                                                         │
/// │  Cash register: opening + sales + supplies - withdrawals = expected    │
/// │                                                                         │
/// │  Current account: debits - credits = customer balance                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from reais and centavos.
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// assert_eq!(Money::from_reais(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_reais(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the reais part should be negative.
    #[inline]
    pub const fn from_reais(reais: i64, centavos: i64) -> Self {
        if reais < 0 {
            Money(reais * 100 - centavos)
        } else {
            Money(reais * 100 + centavos)
        }
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole reais portion (truncated toward zero).
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount, rounded half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// // 8.25% of R$ 10,00 = R$ 0,825 → R$ 0,83
    /// assert_eq!(Money::from_cents(1000).percentage(825).cents(), 83);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        // i128 prevents overflow on large amounts
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_cents(part as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Arguments
    /// * `discount_bps` - Discount in basis points (1000 = 10%)
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(10000);
    /// assert_eq!(subtotal.apply_percentage_discount(1000).cents(), 9000);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        *self - self.percentage(discount_bps)
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Parses an amount typed by an operator.
    ///
    /// ## Accepted Forms
    /// ```text
    /// "R$ 1.234,56"  → 123456      "1234.56" → 123456
    /// "1234,5"       → 123450      "10"      → 1000
    /// "-5,50"        → -550        "1.234"   → 123400 (thousands)
    /// ```
    ///
    /// ## Errors
    /// Empty input, stray characters, or more than two decimal digits.
    pub fn parse(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::invalid("valor", reason);

        let mut text = input.trim();
        let negative = text.starts_with('-');
        if negative {
            text = text[1..].trim_start();
        }
        text = text.strip_prefix("R$").unwrap_or(text).trim();

        if text.is_empty() {
            return Err(ValidationError::required("valor"));
        }

        if !text.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
            return Err(invalid("use apenas dígitos, ponto e vírgula"));
        }

        // Decide which separator marks the centavos.
        let (whole, frac) = if let Some(pos) = text.rfind(',') {
            (text[..pos].replace('.', ""), &text[pos + 1..])
        } else if let Some(pos) = text.rfind('.') {
            let after = &text[pos + 1..];
            if text.matches('.').count() == 1 && after.len() <= 2 {
                (text[..pos].to_string(), after)
            } else {
                (text.replace('.', ""), "")
            }
        } else {
            (text.to_string(), "")
        };

        if whole.contains(',') || frac.contains('.') || frac.contains(',') {
            return Err(invalid("separadores fora de posição"));
        }
        if frac.len() > 2 {
            return Err(invalid("no máximo 2 casas decimais"));
        }

        let reais: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("valor muito grande"))?
        };
        let centavos: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("centavos"))? * 10,
            _ => frac.parse().map_err(|_| invalid("centavos"))?,
        };

        let cents = reais
            .checked_mul(100)
            .and_then(|v| v.checked_add(centavos))
            .ok_or_else(|| invalid("valor muito grande"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money the way it is printed on receipts: `R$ 1.234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let reais = self.reais().unsigned_abs().to_string();

        // Group thousands with dots
        let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
        for (i, ch) in reais.chars().enumerate() {
            if i > 0 && (reais.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, self.centavos_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
