//! HTTP client for the lookup services.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info};
use url::Url;

use crate::brasilapi::{parse_company, CompanyInfo};
use crate::error::{LookupError, LookupResult};
use crate::viacep::parse_address;
use pdv_core::validation::{validate_cep, validate_cnpj};
use pdv_core::Address;

pub const VIACEP_URL: &str = "https://viacep.com.br";
pub const BRASILAPI_URL: &str = "https://brasilapi.com.br";

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub viacep_url: String,
    pub brasilapi_url: String,
    pub timeout: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig {
            viacep_url: VIACEP_URL.to_string(),
            brasilapi_url: BRASILAPI_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LookupClient {
    http: Client,
    config: LookupConfig,
}

impl LookupClient {
    pub fn new(config: LookupConfig) -> LookupResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("balcao-pdv/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;
        Ok(LookupClient { http, config })
    }

    /// Address for a CEP. `NotFound` when ViaCEP does not know it.
    pub async fn address_by_cep(&self, cep: &str) -> LookupResult<Address> {
        let cep = validate_cep(cep)?;
        let url = endpoint(&self.config.viacep_url, &["ws", &cep, "json", ""])?;

        let body = self.get_text(url, &format!("CEP {}", cep)).await?;
        let address = parse_address(&cep, &body)?;
        info!(cep = %cep, city = ?address.city, "CEP found");
        Ok(address)
    }

    /// Registration data for a CNPJ. `NotFound` on 404.
    pub async fn company_by_cnpj(&self, cnpj: &str) -> LookupResult<CompanyInfo> {
        let cnpj = validate_cnpj(cnpj)?;
        let url = endpoint(&self.config.brasilapi_url, &["api", "cnpj", "v1", &cnpj])?;

        let body = self.get_text(url, &format!("CNPJ {}", cnpj)).await?;
        let info = parse_company(&cnpj, &body)?;
        info!(cnpj = %cnpj, status = ?info.status, "CNPJ found");
        Ok(info)
    }

    async fn get_text(&self, url: Url, what: &str) -> LookupResult<String> {
        debug!(url = %url, "Lookup request");
        let response = self.http.get(url.clone()).send().await?;
        match response.status() {
            s if s.is_success() => Ok(response.text().await?),
            StatusCode::NOT_FOUND => Err(LookupError::not_found(what)),
            // ViaCEP answers 400 for malformed CEPs that passed local checks
            StatusCode::BAD_REQUEST => Err(LookupError::not_found(what)),
            s => Err(LookupError::Status {
                status: s.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

/// Joins path segments onto a base URL. An empty last segment keeps a
/// trailing slash.
fn endpoint(base: &str, segments: &[&str]) -> LookupResult<Url> {
    let mut url = Url::parse(base).map_err(|e| LookupError::BadUrl(format!("{}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| LookupError::BadUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(
            endpoint(VIACEP_URL, &["ws", "01001000", "json", ""]).unwrap().as_str(),
            "https://viacep.com.br/ws/01001000/json/"
        );
        assert_eq!(
            endpoint("http://localhost:8080/", &["api", "cnpj", "v1", "11222333000181"])
                .unwrap()
                .as_str(),
            "http://localhost:8080/api/cnpj/v1/11222333000181"
        );
        assert!(endpoint("not a url", &["x"]).is_err());
    }

    #[tokio::test]
    async fn test_invalid_input_never_hits_network() {
        // Nothing listens on port 9; a request would fail with Http instead
        let client = LookupClient::new(LookupConfig {
            viacep_url: "http://127.0.0.1:9".to_string(),
            brasilapi_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        assert!(matches!(
            client.address_by_cep("123").await,
            Err(LookupError::InvalidInput(_))
        ));
        assert!(matches!(
            client.company_by_cnpj("11.222.333/0001-00").await,
            Err(LookupError::InvalidInput(_))
        ));
    }
}
