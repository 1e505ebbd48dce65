//! Store registration (single row). Printed on every receipt header.

use chrono::Utc;
use tracing::{info, warn};

use super::clean;
use super::person::resolve_address;
use crate::cli::CompanyCommand;
use crate::error::{AppError, AppResult};
use crate::output::{datetime, opt};
use crate::state::AppState;
use pdv_core::validation::format_document;
use pdv_core::{Address, Company};
use pdv_lookup::LookupClient;

pub async fn run(state: &mut AppState, cmd: CompanyCommand) -> AppResult<String> {
    match cmd {
        CompanyCommand::Show => Ok(match state.company() {
            Some(company) => details(company),
            None => "Empresa não cadastrada. Use `pdv company set` ou `pdv company fetch`.".into(),
        }),
        CompanyCommand::Set {
            legal_name,
            trade_name,
            cnpj,
            ie,
            phone,
            email,
            address,
        } => {
            let mut company = match state.company().cloned() {
                Some(c) => c,
                None => blank(
                    legal_name
                        .clone()
                        .ok_or_else(|| AppError::validation("Informe a razão social (--legal-name)"))?,
                ),
            };
            if let Some(v) = legal_name {
                company.legal_name = v;
            }
            if let Some(v) = trade_name {
                company.trade_name = clean(Some(v));
            }
            if let Some(v) = cnpj {
                company.cnpj = clean(Some(v));
            }
            if let Some(v) = ie {
                company.state_registration = clean(Some(v));
            }
            if let Some(v) = phone {
                company.phone = clean(Some(v));
            }
            if let Some(v) = email {
                company.email = clean(Some(v));
            }
            company.address = resolve_address(state, company.address.clone(), &address).await;

            let saved = state.db().company().upsert(&company).await?;
            state.set_company(saved.clone());
            Ok(format!("Empresa {} salva.", saved.display_name()))
        }
        CompanyCommand::Fetch { cnpj } => {
            let client = LookupClient::new(state.config().lookup_config())?;
            let found = client.company_by_cnpj(&cnpj).await?;

            let mut company = state
                .company()
                .cloned()
                .unwrap_or_else(|| blank(found.legal_name.clone()));
            found.apply_to(&mut company);

            let saved = state.db().company().upsert(&company).await?;
            state.set_company(saved.clone());
            info!(cnpj = %found.cnpj, "Company filled from CNPJ lookup");

            let mut out = details(&saved);
            if !found.is_active() {
                warn!(cnpj = %found.cnpj, status = ?found.status, "CNPJ is not active");
                out.push_str(&format!(
                    "\nAtenção: situação cadastral {}",
                    found.status.as_deref().unwrap_or("desconhecida")
                ));
            }
            Ok(out)
        }
    }
}

fn blank(legal_name: String) -> Company {
    Company {
        id: String::new(),
        legal_name,
        trade_name: None,
        cnpj: None,
        state_registration: None,
        phone: None,
        email: None,
        address: Address::default(),
        updated_at: Utc::now(),
    }
}

fn details(c: &Company) -> String {
    [
        format!("Razão social:  {}", c.legal_name),
        format!("Fantasia:      {}", opt(c.trade_name.as_deref())),
        format!(
            "CNPJ:          {}",
            c.cnpj.as_deref().map(format_document).unwrap_or_else(|| "-".into())
        ),
        format!("IE:            {}", opt(c.state_registration.as_deref())),
        format!("Telefone:      {}", opt(c.phone.as_deref())),
        format!("E-mail:        {}", opt(c.email.as_deref())),
        format!("Endereço:      {}", c.address.one_line()),
        format!("Alterado em:   {}", datetime(c.updated_at)),
    ]
    .join("\n")
}
