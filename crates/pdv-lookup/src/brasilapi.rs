//! BrasilAPI CNPJ response parsing.

use serde::{Deserialize, Serialize};

use crate::error::{LookupError, LookupResult};
use pdv_core::{Address, Company};

/// Registration data of a company, as published by the Receita Federal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyInfo {
    /// 14 digits.
    pub cnpj: String,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub address: Address,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Registration status, e.g. `ATIVA`, `BAIXADA`.
    pub status: Option<String>,
}

impl CompanyInfo {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map_or(true, |s| s.eq_ignore_ascii_case("ativa"))
    }

    /// Copies the looked-up data over a company registration. Fields the
    /// lookup did not return are kept.
    pub fn apply_to(&self, company: &mut Company) {
        company.cnpj = Some(self.cnpj.clone());
        company.legal_name = self.legal_name.clone();
        if self.trade_name.is_some() {
            company.trade_name = self.trade_name.clone();
        }
        if !self.address.is_empty() {
            company.address = self.address.clone();
        }
        if self.phone.is_some() {
            company.phone = self.phone.clone();
        }
        if self.email.is_some() {
            company.email = self.email.clone();
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CnpjBody {
    cnpj: String,
    razao_social: String,
    nome_fantasia: Option<String>,
    descricao_tipo_de_logradouro: Option<String>,
    logradouro: Option<String>,
    numero: Option<String>,
    complemento: Option<String>,
    bairro: Option<String>,
    municipio: Option<String>,
    uf: Option<String>,
    cep: Option<serde_json::Value>,
    ddd_telefone_1: Option<String>,
    email: Option<String>,
    descricao_situacao_cadastral: Option<String>,
}

fn clean(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parses a BrasilAPI body for the already validated `cnpj` (14 digits).
pub fn parse_company(cnpj: &str, body: &str) -> LookupResult<CompanyInfo> {
    let body: CnpjBody = serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    let legal_name = body.razao_social.trim().to_string();
    if legal_name.is_empty() {
        return Err(LookupError::Decode("razao_social ausente".to_string()));
    }

    // The street type ("RUA", "AVENIDA") comes separately from the name
    let street = match (clean(body.descricao_tipo_de_logradouro), clean(body.logradouro)) {
        (Some(kind), Some(name)) if !name.to_uppercase().starts_with(&kind.to_uppercase()) => {
            Some(format!("{} {}", kind, name))
        }
        (_, name) => name,
    };
    let cep = body.cep.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(format!("{:08}", n.as_u64().unwrap_or(0))),
        _ => None,
    });
    let cep = cep
        .map(|c| c.chars().filter(|ch| ch.is_ascii_digit()).collect::<String>())
        .filter(|c| c.len() == 8);

    let returned: String = body.cnpj.chars().filter(|c| c.is_ascii_digit()).collect();

    Ok(CompanyInfo {
        cnpj: if returned.len() == 14 { returned } else { cnpj.to_string() },
        legal_name,
        trade_name: clean(body.nome_fantasia),
        address: Address {
            cep,
            street,
            number: clean(body.numero),
            complement: clean(body.complemento),
            district: clean(body.bairro),
            city: clean(body.municipio),
            state: clean(body.uf).map(|u| u.to_uppercase()),
        },
        phone: clean(body.ddd_telefone_1),
        email: clean(body.email).map(|e| e.to_lowercase()),
        status: clean(body.descricao_situacao_cadastral),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "uf": "SP",
        "cep": "01311000",
        "cnpj": "11222333000181",
        "pais": null,
        "email": "CONTATO@BOAVISTA.COM.BR",
        "porte": "MICRO EMPRESA",
        "bairro": "BELA VISTA",
        "numero": "1000",
        "municipio": "SAO PAULO",
        "logradouro": "PAULISTA",
        "complemento": "ANDAR 5",
        "razao_social": "COMERCIAL BOA VISTA LTDA",
        "nome_fantasia": "MERCADINHO BOA VISTA",
        "ddd_telefone_1": "1133334444",
        "descricao_tipo_de_logradouro": "AVENIDA",
        "descricao_situacao_cadastral": "ATIVA",
        "cnae_fiscal": 4712100
    }"#;

    fn blank_company() -> Company {
        Company {
            id: "c".to_string(),
            legal_name: "Antiga".to_string(),
            trade_name: None,
            cnpj: None,
            state_registration: Some("123".to_string()),
            phone: None,
            email: None,
            address: Address::default(),
            updated_at: Default::default(),
        }
    }

    #[test]
    fn test_parse_company() {
        let info = parse_company("11222333000181", FIXTURE).unwrap();
        assert_eq!(info.legal_name, "COMERCIAL BOA VISTA LTDA");
        assert_eq!(info.trade_name.as_deref(), Some("MERCADINHO BOA VISTA"));
        assert_eq!(info.address.street.as_deref(), Some("AVENIDA PAULISTA"));
        assert_eq!(info.address.cep.as_deref(), Some("01311000"));
        assert_eq!(info.email.as_deref(), Some("contato@boavista.com.br"));
        assert!(info.is_active());
    }

    #[test]
    fn test_numeric_cep_and_missing_fields() {
        let body = r#"{"cnpj":"11222333000181","razao_social":"X LTDA","cep":1311000,"nome_fantasia":""}"#;
        let info = parse_company("11222333000181", body).unwrap();
        assert_eq!(info.address.cep.as_deref(), Some("01311000"));
        assert_eq!(info.trade_name, None);
        assert!(parse_company("11222333000181", r#"{"cnpj":"1"}"#).is_err());
    }

    #[test]
    fn test_apply_to_keeps_unknown_fields() {
        let info = parse_company("11222333000181", FIXTURE).unwrap();
        let mut c = blank_company();
        info.apply_to(&mut c);
        assert_eq!(c.legal_name, "COMERCIAL BOA VISTA LTDA");
        assert_eq!(c.cnpj.as_deref(), Some("11222333000181"));
        assert_eq!(c.state_registration.as_deref(), Some("123"));
        assert_eq!(c.address.city.as_deref(), Some("SAO PAULO"));
    }
}
