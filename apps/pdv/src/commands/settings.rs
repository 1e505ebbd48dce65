//! System settings and the e-commerce switch.
//!
//! ```text
//! ecommerce.enabled        store-wide switch, set by `pdv ecommerce enable`
//! ecommerce.url            storefront address
//! sale.require_open_cash   refuse checkouts while the register is closed
//! ```

use crate::cli::{EcommerceCommand, SettingsCommand};
use crate::error::{AppError, AppResult};
use crate::output::{datetime, Align, Table};
use crate::state::{AppState, Session};
use pdv_core::{EcommerceAccess, Module};

pub async fn run(state: &AppState, cmd: SettingsCommand) -> AppResult<String> {
    let settings = state.db().settings();
    match cmd {
        SettingsCommand::List => {
            let all = settings.all().await?;
            if all.is_empty() {
                return Ok("Nenhuma configuração gravada.".into());
            }
            let mut table = Table::new(&[
                ("Chave", Align::Left),
                ("Valor", Align::Left),
                ("Alterado em", Align::Left),
            ]);
            for s in &all {
                table.row([s.key.clone(), s.value.clone(), datetime(s.updated_at)]);
            }
            Ok(table.render())
        }
        SettingsCommand::Get { key } => settings
            .get(&key)
            .await?
            .ok_or_else(|| AppError::not_found("Configuração", &key)),
        SettingsCommand::Set { key, value } => {
            settings.set(&key, &value).await?;
            Ok(format!("{} = {}", key.trim(), value.trim()))
        }
    }
}

/// `open` needs the e-commerce module; switching it needs settings.
pub async fn ecommerce(state: &AppState, session: &Session, cmd: EcommerceCommand) -> AppResult<String> {
    match cmd {
        EcommerceCommand::Open => {
            let url = session.require_ecommerce(state).await?;
            Ok(format!("Loja virtual: {}", url))
        }
        EcommerceCommand::Enable { url } => {
            session.require(Module::Settings)?;
            state
                .db()
                .settings()
                .set_ecommerce(&EcommerceAccess {
                    enabled: true,
                    url: Some(url.trim().to_string()),
                })
                .await?;
            Ok(format!("E-commerce habilitado: {}", url.trim()))
        }
        EcommerceCommand::Disable => {
            session.require(Module::Settings)?;
            let settings = state.db().settings();
            let current = settings.ecommerce_access().await?;
            settings
                .set_ecommerce(&EcommerceAccess {
                    enabled: false,
                    url: current.url,
                })
                .await?;
            Ok("E-commerce desabilitado.".into())
        }
    }
}
