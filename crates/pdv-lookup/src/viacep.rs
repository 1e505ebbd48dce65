//! ViaCEP response parsing.
//!
//! An unknown CEP still answers 200, with `{"erro": true}` (older deployments
//! send the string `"true"`).

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LookupError, LookupResult};
use pdv_core::Address;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViaCepBody {
    cep: String,
    logradouro: String,
    complemento: String,
    bairro: String,
    localidade: String,
    uf: String,
}

fn some(s: String) -> Option<String> {
    let s = s.trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parses a ViaCEP body for the already validated `cep` (8 digits).
pub fn parse_address(cep: &str, body: &str) -> LookupResult<Address> {
    let value: Value = serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;

    let erro = match value.get("erro") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };
    if erro {
        return Err(LookupError::not_found(format!("CEP {}", cep)));
    }

    let body: ViaCepBody = serde_json::from_value(value).map_err(|e| LookupError::Decode(e.to_string()))?;
    let returned: String = body.cep.chars().filter(|c| c.is_ascii_digit()).collect();

    Ok(Address {
        cep: Some(if returned.len() == 8 { returned } else { cep.to_string() }),
        street: some(body.logradouro),
        number: None,
        complement: some(body.complemento),
        district: some(body.bairro),
        city: some(body.localidade),
        state: some(body.uf.to_uppercase()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_found() {
        let body = r#"{
            "cep": "01001-000",
            "logradouro": "Praça da Sé",
            "complemento": "lado ímpar",
            "unidade": "",
            "bairro": "Sé",
            "localidade": "São Paulo",
            "uf": "SP",
            "ibge": "3550308",
            "gia": "1004",
            "ddd": "11",
            "siafi": "7107"
        }"#;
        let address = parse_address("01001000", body).unwrap();
        assert_eq!(address.cep.as_deref(), Some("01001000"));
        assert_eq!(address.street.as_deref(), Some("Praça da Sé"));
        assert_eq!(address.district.as_deref(), Some("Sé"));
        assert_eq!(address.city.as_deref(), Some("São Paulo"));
        assert_eq!(address.state.as_deref(), Some("SP"));
        assert_eq!(address.number, None);
    }

    #[test]
    fn test_parse_not_found() {
        assert!(matches!(
            parse_address("99999999", r#"{"erro": true}"#),
            Err(LookupError::NotFound { .. })
        ));
        assert!(matches!(
            parse_address("99999999", r#"{"erro": "true"}"#),
            Err(LookupError::NotFound { .. })
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_address("01001000", "<html>"),
            Err(LookupError::Decode(_))
        ));
    }
}
