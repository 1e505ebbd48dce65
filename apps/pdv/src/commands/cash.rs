//! Cash register: opening, supply (suprimento), withdrawal (sangria) and
//! closing with the counted amount.

use tracing::info;

use crate::cli::CashCommand;
use crate::error::{AppError, AppResult};
use crate::output::{datetime, opt, Align, Table};
use crate::state::{AppState, Session};
use pdv_core::{CashSession, Money};

pub async fn run(state: &AppState, session: &Session, cmd: CashCommand) -> AppResult<String> {
    let cash = state.db().cash();
    match cmd {
        CashCommand::Open { opening } => {
            let opened = cash.open(session.user_id(), opening).await?;
            Ok(format!(
                "Caixa aberto em {} com {}.",
                datetime(opened.opened_at),
                Money::from_cents(opened.opening_balance_cents)
            ))
        }
        CashCommand::Status => {
            let current = cash
                .current()
                .await?
                .ok_or_else(|| AppError::business("Caixa fechado"))?;
            status(state, &current).await
        }
        CashCommand::Supply { amount, description } => {
            cash.supply(session.user_id(), amount, description.as_deref())
                .await?;
            let current = current_id(state).await?;
            Ok(format!(
                "Suprimento de {} registrado. Saldo esperado: {}",
                amount,
                cash.expected_balance(&current).await?
            ))
        }
        CashCommand::Withdraw { amount, description } => {
            cash.withdraw(session.user_id(), amount, description.as_deref())
                .await?;
            let current = current_id(state).await?;
            Ok(format!(
                "Sangria de {} registrada. Saldo esperado: {}",
                amount,
                cash.expected_balance(&current).await?
            ))
        }
        CashCommand::Close { counted } => {
            let closing = cash.close(session.user_id(), counted).await?;
            info!(
                session = %closing.session.id,
                expected = %closing.expected,
                counted = %closing.counted,
                "Cash register closed by operator"
            );
            let verdict = if closing.difference.is_positive() {
                format!("Sobra:     {}", closing.difference)
            } else if closing.difference.is_negative() {
                format!("Falta:     {}", -closing.difference)
            } else {
                "Caixa conferido sem diferença.".to_string()
            };
            Ok([
                "Caixa fechado.".to_string(),
                format!("Esperado:  {}", closing.expected),
                format!("Contado:   {}", closing.counted),
                verdict,
            ]
            .join("\n"))
        }
        CashCommand::History { limit } => {
            let sessions = cash.history(limit).await?;
            if sessions.is_empty() {
                return Ok("Nenhum caixa registrado.".into());
            }
            let mut table = Table::new(&[
                ("Abertura", Align::Left),
                ("Fechamento", Align::Left),
                ("Inicial", Align::Right),
                ("Esperado", Align::Right),
                ("Contado", Align::Right),
                ("Diferença", Align::Right),
            ]);
            for s in &sessions {
                let money = |v: Option<i64>| v.map(|c| Money::from_cents(c).to_string());
                table.row([
                    datetime(s.opened_at),
                    s.closed_at.map(datetime).unwrap_or_else(|| "aberto".into()),
                    Money::from_cents(s.opening_balance_cents).to_string(),
                    money(s.expected_cents).unwrap_or_else(|| "-".into()),
                    money(s.counted_cents).unwrap_or_else(|| "-".into()),
                    s.difference().map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                ]);
            }
            Ok(table.render())
        }
    }
}

async fn current_id(state: &AppState) -> AppResult<String> {
    Ok(state
        .db()
        .cash()
        .current()
        .await?
        .ok_or_else(|| AppError::business("Caixa fechado"))?
        .id)
}

async fn status(state: &AppState, current: &CashSession) -> AppResult<String> {
    let cash = state.db().cash();
    let movements = cash.movements(&current.id).await?;
    let expected = cash.expected_balance(&current.id).await?;

    let mut table = Table::new(&[
        ("Hora", Align::Left),
        ("Tipo", Align::Left),
        ("Valor", Align::Right),
        ("Descrição", Align::Left),
    ]);
    for m in &movements {
        table.row([
            datetime(m.created_at),
            m.kind.label().to_string(),
            Money::from_cents(m.amount_cents).to_string(),
            opt(m.description.as_deref()).to_string(),
        ]);
    }
    Ok(format!(
        "Caixa aberto desde {}\n\n{}\n\nSaldo esperado: {}",
        datetime(current.opened_at),
        table.render(),
        expected
    ))
}
