//! Customer current accounts (fiado).

use super::find_customer;
use crate::cli::AccountCommand;
use crate::error::AppResult;
use crate::output::{date, datetime, today, Align, Table};
use crate::state::{AppState, Session};
use pdv_core::{EntryKind, Money};

pub async fn run(state: &AppState, session: &Session, cmd: AccountCommand) -> AppResult<String> {
    let accounts = state.db().accounts();
    match cmd {
        AccountCommand::Statement { customer } => {
            let person = find_customer(state, &customer).await?;
            let entries = accounts.entries(&person.id).await?;
            if entries.is_empty() {
                return Ok(format!("{} não tem lançamentos.", person.display_name()));
            }

            let mut table = Table::new(&[
                ("Data", Align::Left),
                ("Descrição", Align::Left),
                ("Débito", Align::Right),
                ("Crédito", Align::Right),
                ("Saldo", Align::Right),
            ]);
            let mut running = Money::zero();
            for entry in &entries {
                running += entry.signed_amount();
                let amount = Money::from_cents(entry.amount_cents).to_string();
                let (debit, credit) = match entry.kind {
                    EntryKind::Debit => (amount, String::new()),
                    EntryKind::Credit => (String::new(), amount),
                };
                table.row([
                    datetime(entry.created_at),
                    entry.description.clone(),
                    debit,
                    credit,
                    running.to_string(),
                ]);
            }

            let mut out = format!("{}\n\n{}", person.display_name(), table.render());
            out.push_str(&format!("\n\nSaldo devedor: {}", running));
            if person.credit_limit_cents > 0 {
                let available = person.credit_limit() - running;
                out.push_str(&format!("\nLimite disponível: {}", available));
            }
            Ok(out)
        }
        AccountCommand::Pay {
            customer,
            amount,
            method,
            description,
        } => {
            let person = find_customer(state, &customer).await?;
            accounts
                .credit(
                    &person.id,
                    amount,
                    method,
                    session.user_id(),
                    description.as_deref(),
                )
                .await?;
            let balance = accounts.balance(&person.id).await?;
            Ok(format!(
                "Pagamento de {} recebido de {}. Saldo devedor: {}",
                amount,
                person.display_name(),
                balance
            ))
        }
        AccountCommand::Debit {
            customer,
            amount,
            description,
        } => {
            let person = find_customer(state, &customer).await?;
            accounts.debit(&person.id, amount, &description).await?;
            let balance = accounts.balance(&person.id).await?;
            Ok(format!(
                "Débito de {} lançado para {}. Saldo devedor: {}",
                amount,
                person.display_name(),
                balance
            ))
        }
        AccountCommand::Debtors => {
            let debtors = accounts.debtors().await?;
            if debtors.is_empty() {
                return Ok("Nenhum cliente com saldo devedor.".into());
            }
            let mut table = Table::new(&[("Cliente", Align::Left), ("Saldo", Align::Right)]);
            let mut total = Money::zero();
            for d in &debtors {
                total += d.balance();
                table.row([d.name.clone(), d.balance().to_string()]);
            }
            Ok(format!(
                "{}\n\nTotal a receber em {}: {}",
                table.render(),
                date(today()),
                total
            ))
        }
    }
}
