//! # Validation Module
//!
//! Input validation for registrations, the cart and logins.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI (clap)                                                    │
//! │  └── Types and required arguments                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Documents: CPF, CNPJ (check digits)                                │
//! │  ├── Addresses: CEP, UF                                                 │
//! │  ├── Contact: e-mail, phone                                             │
//! │  └── Products, quantities, prices, logins                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  └── NOT NULL, UNIQUE, CHECK, foreign keys                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators that clean their input (documents, CEP, phone) return the
//! normalized value, digits only, ready to store.
//!
//! ## Usage
//! ```rust
//! use pdv_core::validation::{validate_cpf, validate_quantity};
//!
//! assert_eq!(validate_cpf("529.982.247-25").unwrap(), "52998224725");
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_DISCOUNT_BPS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS, MIN_PASSWORD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Brazilian state codes (27 UFs).
pub const UFS: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

// =============================================================================
// Helpers
// =============================================================================

/// Keeps only ASCII digits: `"529.982.247-25"` → `"52998224725"`.
pub fn only_digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn digits_of(s: &str) -> Vec<u32> {
    s.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

// =============================================================================
// Documents
// =============================================================================

/// Validates a CPF and returns its 11 digits.
///
/// ## Rules
/// - Punctuation is ignored
/// - Exactly 11 digits
/// - Repeated-digit sequences (`111.111.111-11`) are rejected
/// - Both check digits must match (mod 11)
pub fn validate_cpf(cpf: &str) -> ValidationResult<String> {
    let clean = only_digits(cpf);
    if clean.is_empty() {
        return Err(ValidationError::required("CPF"));
    }
    if clean.len() != 11 {
        return Err(ValidationError::invalid("CPF", "deve ter 11 dígitos"));
    }

    let d = digits_of(&clean);
    if all_same(&d) {
        return Err(ValidationError::invalid("CPF", "sequência repetida"));
    }

    let check = |len: usize| -> u32 {
        let sum: u32 = d[..len]
            .iter()
            .enumerate()
            .map(|(i, v)| v * (len as u32 + 1 - i as u32))
            .sum();
        let r = (sum * 10) % 11;
        if r == 10 {
            0
        } else {
            r
        }
    };

    if check(9) != d[9] || check(10) != d[10] {
        return Err(ValidationError::invalid("CPF", "dígito verificador"));
    }

    Ok(clean)
}

/// Validates a CNPJ and returns its 14 digits.
pub fn validate_cnpj(cnpj: &str) -> ValidationResult<String> {
    const W1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const W2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let clean = only_digits(cnpj);
    if clean.is_empty() {
        return Err(ValidationError::required("CNPJ"));
    }
    if clean.len() != 14 {
        return Err(ValidationError::invalid("CNPJ", "deve ter 14 dígitos"));
    }

    let d = digits_of(&clean);
    if all_same(&d) {
        return Err(ValidationError::invalid("CNPJ", "sequência repetida"));
    }

    let check = |weights: &[u32]| -> u32 {
        let sum: u32 = d.iter().zip(weights).map(|(v, w)| v * w).sum();
        let r = sum % 11;
        if r < 2 {
            0
        } else {
            11 - r
        }
    };

    if check(&W1) != d[12] || check(&W2) != d[13] {
        return Err(ValidationError::invalid("CNPJ", "dígito verificador"));
    }

    Ok(clean)
}

/// Validates a CPF or a CNPJ, chosen by digit count.
pub fn validate_document(document: &str) -> ValidationResult<String> {
    match only_digits(document).len() {
        0 => Err(ValidationError::required("documento")),
        11 => validate_cpf(document),
        14 => validate_cnpj(document),
        _ => Err(ValidationError::invalid(
            "documento",
            "informe um CPF (11 dígitos) ou CNPJ (14 dígitos)",
        )),
    }
}

/// Formats stored digits for display: `529.982.247-25`, `11.222.333/0001-81`.
/// Anything else is returned unchanged.
pub fn format_document(digits: &str) -> String {
    match digits.len() {
        11 if digits.chars().all(|c| c.is_ascii_digit()) => format!(
            "{}.{}.{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..11]
        ),
        14 if digits.chars().all(|c| c.is_ascii_digit()) => format!(
            "{}.{}.{}/{}-{}",
            &digits[0..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..12],
            &digits[12..14]
        ),
        _ => digits.to_string(),
    }
}

// =============================================================================
// Address & Contact
// =============================================================================

/// Validates a CEP and returns its 8 digits.
pub fn validate_cep(cep: &str) -> ValidationResult<String> {
    let clean = only_digits(cep);
    if clean.is_empty() {
        return Err(ValidationError::required("CEP"));
    }
    // Only digits, dash and dot may appear in a typed CEP
    if clean.len() != 8 || cep.trim().chars().any(|c| !(c.is_ascii_digit() || c == '-' || c == '.')) {
        return Err(ValidationError::invalid("CEP", "deve ter 8 dígitos"));
    }
    Ok(clean)
}

/// Validates a state code and returns it uppercased.
pub fn validate_uf(uf: &str) -> ValidationResult<String> {
    let uf = uf.trim().to_uppercase();
    if uf.is_empty() {
        return Err(ValidationError::required("UF"));
    }
    if !UFS.contains(&uf.as_str()) {
        return Err(ValidationError::invalid("UF", "sigla de estado desconhecida"));
    }
    Ok(uf)
}

/// Checks the shape of an e-mail address (`local@domain.tld`).
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::required("e-mail"));
    }
    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "e-mail".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::invalid("e-mail", "formato esperado nome@dominio.com");
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || domain.contains("..")
    {
        return Err(invalid());
    }

    Ok(email.to_string())
}

/// Validates a phone with area code and returns its digits (10 or 11).
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let clean = only_digits(phone);
    if clean.is_empty() {
        return Err(ValidationError::required("telefone"));
    }
    if !(10..=11).contains(&clean.len()) {
        return Err(ValidationError::invalid(
            "telefone",
            "informe DDD + número (10 ou 11 dígitos)",
        ));
    }
    Ok(clean)
}

// =============================================================================
// Products
// =============================================================================

/// Validates an internal product code.
///
/// ## Rules
/// - Not empty, at most 30 characters
/// - Letters, digits, hyphens, underscores and dots only
///
/// ## Example
/// ```rust
/// use pdv_core::validation::validate_product_code;
///
/// assert!(validate_product_code("ARROZ-5KG").is_ok());
/// assert!(validate_product_code("").is_err());
/// assert!(validate_product_code("com espaço").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("código"));
    }

    if code.chars().count() > 30 {
        return Err(ValidationError::TooLong {
            field: "código".to_string(),
            max: 30,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::invalid(
            "código",
            "use apenas letras, números, hífen, ponto e sublinhado",
        ));
    }

    Ok(())
}

/// Validates an EAN-8, UPC-A (12) or EAN-13 barcode and returns its digits.
pub fn validate_barcode(barcode: &str) -> ValidationResult<String> {
    let code = barcode.trim();
    if code.is_empty() {
        return Err(ValidationError::required("código de barras"));
    }
    if !code.chars().all(|c| c.is_ascii_digit()) || ![8, 12, 13].contains(&code.len()) {
        return Err(ValidationError::invalid(
            "código de barras",
            "EAN-8, UPC-A ou EAN-13",
        ));
    }

    let d = digits_of(code);
    let (payload, check) = d.split_at(d.len() - 1);
    // Weights alternate 3,1,3,1... starting from the digit next to the check digit
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(i, v)| if i % 2 == 0 { v * 3 } else { *v })
        .sum();
    let expected = (10 - sum % 10) % 10;

    if expected != check[0] {
        return Err(ValidationError::invalid("código de barras", "dígito verificador"));
    }

    Ok(code.to_string())
}

/// Validates a product name (1-120 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("descrição", name, 120)
}

/// Validates a free-text name field of at most `max` characters.
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a search query. Empty is allowed; returns the trimmed text.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "busca".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Checkout: add item                                                     │
/// │                                                                         │
/// │  Operator types quantity: 5                                             │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                   │
/// │       │                                                                 │
/// │       ├── qty <= 0?     → "quantidade deve ser positivo"                │
/// │       ├── qty > 9999?   → "quantidade deve estar entre 1 e 9999"        │
/// │       └── OK → Cart::add                                                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantidade".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantidade".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in centavos. Zero is allowed (brindes).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "preço".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a payment amount in centavos (must be positive).
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "valor do pagamento".to_string(),
        });
    }

    Ok(())
}

/// Validates a discount in basis points (0 to 100%).
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > MAX_DISCOUNT_BPS {
        return Err(ValidationError::OutOfRange {
            field: "desconto".to_string(),
            min: 0,
            max: MAX_DISCOUNT_BPS as i64,
        });
    }

    Ok(())
}

/// Validates cart size (number of distinct lines).
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "itens do carrinho".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Logins
// =============================================================================

/// Validates a username and returns it lowercased.
///
/// ## Rules
/// - 3 to 32 characters
/// - ASCII letters, digits, dot, hyphen, underscore
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let name = username.trim().to_lowercase();

    if name.is_empty() {
        return Err(ValidationError::required("usuário"));
    }
    if name.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "usuário".to_string(),
            min: 3,
        });
    }
    if name.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "usuário".to_string(),
            max: 32,
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid(
            "usuário",
            "use letras sem acento, números, ponto, hífen ou sublinhado",
        ));
    }

    Ok(name)
}

/// Validates a new password's length.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("senha"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "senha".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    if password.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "senha".to_string(),
            max: 128,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
