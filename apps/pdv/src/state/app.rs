//! # Application State
//!
//! What the startup worker hands to the commands: configuration, the open
//! database and the store registration used on receipts.

use tracing::debug;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use pdv_core::validation::{format_document, only_digits};
use pdv_core::{Company, Person};
use pdv_db::{Database, SaleDetail};
use pdv_print::{Printer, Receipt};

#[derive(Debug, Clone)]
pub struct AppState {
    config: AppConfig,
    db: Database,
    company: Option<Company>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, company: Option<Company>) -> Self {
        AppState {
            config,
            db,
            company,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn company(&self) -> Option<&Company> {
        self.company.as_ref()
    }

    /// Replaces the cached company after the registration changes.
    pub fn set_company(&mut self, company: Company) {
        self.company = Some(company);
    }

    /// Resolves a printer: the given name, then `[printer] default` from the
    /// config file, then the printer marked as default in the database.
    pub async fn printer(&self, name: Option<&str>) -> AppResult<Printer> {
        let wanted = name.or(self.config.printer.default.as_deref());
        let config = match wanted {
            Some(name) => self
                .db
                .printers()
                .get_by_name(name)
                .await?
                .ok_or_else(|| AppError::not_found("Impressora", name))?,
            None => self
                .db
                .printers()
                .default()
                .await?
                .ok_or_else(|| AppError::business("Nenhuma impressora configurada"))?,
        };
        debug!(printer = %config.name, transport = %config.transport, "Printer resolved");
        Ok(Printer::from_config(&config))
    }

    /// Builds the printable receipt of a stored sale, applying the store
    /// overrides from the config file.
    pub fn receipt(&self, detail: &SaleDetail, operator: &str, customer: Option<&Person>) -> Receipt {
        let mut receipt = Receipt::from_sale(
            self.company.as_ref(),
            &detail.sale,
            &detail.items,
            &detail.payments,
        )
        .with_operator(operator);

        let store = &self.config.store;
        if let Some(name) = &store.name {
            receipt = receipt.with_store_name(name.clone());
        }
        if self.company.is_none() {
            if let Some(document) = &store.document {
                let digits = only_digits(document);
                let label = if digits.len() == 14 { "CNPJ" } else { "CPF" };
                receipt
                    .header_lines
                    .push(format!("{} {}", label, format_document(&digits)));
            }
        }
        if let Some(footer) = &store.receipt_footer {
            receipt = receipt.with_footer(footer);
        }
        if let Some(person) = customer {
            receipt = receipt.with_customer(person.display_name());
        }
        receipt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;
    use pdv_core::{Cart, Money, PaymentMethod, PrinterConfig, PrinterTransportKind};
    use pdv_db::NewSale;

    async fn sale(state: &AppState) -> SaleDetail {
        let product = testing::product(state, "SAL-1KG", 350, 5).await;
        let admin = testing::admin(state).await;
        let mut cart = Cart::new();
        cart.add(&product, 2).unwrap();
        let tender = cart.tender(&[(PaymentMethod::Cash, Money::from_cents(1000))]).unwrap();
        state
            .db()
            .sales()
            .finalize(NewSale::from_checkout(&cart, tender, admin.user_id()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_printer_resolution() {
        let state = testing::state().await;
        let err = state.printer(None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let printers = state.db().printers();
        for name in ["balcao", "deposito"] {
            let transport: PrinterTransportKind = "tcp://10.0.0.9".parse().unwrap();
            printers.upsert(&PrinterConfig::new(name, transport)).await.unwrap();
        }
        printers.set_default("balcao").await.unwrap();

        assert_eq!(state.printer(None).await.unwrap().name(), "balcao");
        assert_eq!(state.printer(Some("deposito")).await.unwrap().name(), "deposito");
        assert_eq!(
            state.printer(Some("cozinha")).await.unwrap_err().code,
            ErrorCode::NotFound
        );
    }

    #[tokio::test]
    async fn test_config_default_printer_wins() {
        let mut config = AppConfig::default();
        config.printer.default = Some("deposito".into());
        let state = testing::state_with(config).await;

        let printers = state.db().printers();
        for name in ["balcao", "deposito"] {
            let transport: PrinterTransportKind = "tcp://10.0.0.9".parse().unwrap();
            printers.upsert(&PrinterConfig::new(name, transport)).await.unwrap();
        }
        printers.set_default("balcao").await.unwrap();

        assert_eq!(state.printer(None).await.unwrap().name(), "deposito");
    }

    #[tokio::test]
    async fn test_receipt_store_overrides() {
        let mut config = AppConfig::default();
        config.store.name = Some("Mercadinho da Esquina".into());
        config.store.document = Some("11.222.333/0001-81".into());
        config.store.receipt_footer = Some("Trocas em até 7 dias\n\nVolte sempre".into());
        let state = testing::state_with(config).await;
        let detail = sale(&state).await;
        let maria = testing::customer(&state, "Maria", None).await;

        let receipt = state.receipt(&detail, "admin", Some(&maria));
        assert_eq!(receipt.store_name, "Mercadinho da Esquina");
        assert!(receipt.header_lines.contains(&"CNPJ 11.222.333/0001-81".to_string()));
        assert_eq!(receipt.footer, vec!["Trocas em até 7 dias", "Volte sempre"]);
        assert_eq!(receipt.operator.as_deref(), Some("admin"));
        assert_eq!(receipt.customer.as_deref(), Some("Maria"));
        assert_eq!(receipt.change, Money::from_cents(300));
    }
}
