//! CEP and CNPJ lookups, printed without saving anything.

use crate::cli::LookupCommand;
use crate::error::AppResult;
use crate::output::opt;
use crate::state::AppState;
use pdv_core::validation::format_document;
use pdv_lookup::LookupClient;

pub async fn run(state: &AppState, cmd: LookupCommand) -> AppResult<String> {
    let client = LookupClient::new(state.config().lookup_config())?;
    match cmd {
        LookupCommand::Cep { cep } => {
            let address = client.address_by_cep(&cep).await?;
            Ok([
                format!("Logradouro:  {}", opt(address.street.as_deref())),
                format!("Complemento: {}", opt(address.complement.as_deref())),
                format!("Bairro:      {}", opt(address.district.as_deref())),
                format!("Cidade:      {}", opt(address.city.as_deref())),
                format!("UF:          {}", opt(address.state.as_deref())),
            ]
            .join("\n"))
        }
        LookupCommand::Cnpj { cnpj } => {
            let info = client.company_by_cnpj(&cnpj).await?;
            Ok([
                format!("CNPJ:          {}", format_document(&info.cnpj)),
                format!("Razão social:  {}", info.legal_name),
                format!("Fantasia:      {}", opt(info.trade_name.as_deref())),
                format!("Situação:      {}", opt(info.status.as_deref())),
                format!("Endereço:      {}", info.address.one_line()),
                format!("Telefone:      {}", opt(info.phone.as_deref())),
                format!("E-mail:        {}", opt(info.email.as_deref())),
            ]
            .join("\n"))
        }
    }
}
