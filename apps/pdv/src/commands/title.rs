//! Receivables (contas a receber) and payables (contas a pagar).
//!
//! Both groups run the same commands over the same table; the group fixes
//! the title kind.

use tracing::info;

use super::find_person;
use crate::cli::TitleCommand;
use crate::error::{AppError, AppResult};
use crate::output::{date, datetime, today, Align, Table};
use crate::state::{AppState, Session};
use pdv_core::{Money, Title, TitleKind};
use pdv_db::{NewTitle, TitleFilter};

pub async fn run(
    state: &AppState,
    session: &Session,
    kind: TitleKind,
    cmd: TitleCommand,
) -> AppResult<String> {
    let titles = state.db().titles();
    match cmd {
        TitleCommand::List {
            status,
            overdue,
            person,
        } => {
            let mut filter = TitleFilter::new(kind, today());
            filter.status = status;
            filter.overdue_only = overdue;
            if let Some(key) = person {
                filter.person_id = Some(find_person(state, &key).await?.id);
            }
            let list = titles.list(&filter).await?;
            if list.is_empty() {
                return Ok(format!("Nenhuma conta {} encontrada.", kind.label()));
            }
            render_list(state, &list).await
        }
        TitleCommand::Show { id } => {
            let title = find(state, kind, &id).await?;
            let payments = titles.payments(&title.id).await?;
            let mut out = vec![
                format!("Conta {}: {}", kind.label(), title.description),
                format!("Vencimento:  {}", date(title.due_date)),
                format!("Valor:       {}", Money::from_cents(title.amount_cents)),
                format!("Pago:        {}", Money::from_cents(title.paid_cents)),
                format!("Em aberto:   {}", title.open_balance()),
                format!("Situação:    {}", status_of(&title)),
            ];
            if let Some(name) = person_name(state, &title).await? {
                out.insert(1, format!("Pessoa:      {}", name));
            }
            if !payments.is_empty() {
                let mut table = Table::new(&[
                    ("Data", Align::Left),
                    ("Forma", Align::Left),
                    ("Valor", Align::Right),
                ]);
                for p in &payments {
                    table.row([
                        datetime(p.paid_at),
                        p.method.label().to_string(),
                        Money::from_cents(p.amount_cents).to_string(),
                    ]);
                }
                out.push(String::new());
                out.push(table.render());
            }
            Ok(out.join("\n"))
        }
        TitleCommand::Add {
            description,
            amount,
            due,
            person,
        } => {
            let person_id = match person {
                Some(key) => {
                    let p = find_person(state, &key).await?;
                    let fits = match kind {
                        TitleKind::Receivable => p.kind.is_customer(),
                        TitleKind::Payable => p.kind.is_supplier(),
                    };
                    if !fits {
                        return Err(AppError::validation(format!(
                            "{} não é {}",
                            p.name,
                            match kind {
                                TitleKind::Receivable => "cliente",
                                TitleKind::Payable => "fornecedor",
                            }
                        )));
                    }
                    Some(p.id)
                }
                None => None,
            };
            let title = titles
                .create(NewTitle {
                    kind,
                    person_id,
                    description,
                    amount,
                    due_date: due,
                })
                .await?;
            Ok(format!(
                "Conta {} lançada: {} vence em {} (id {}).",
                kind.label(),
                Money::from_cents(title.amount_cents),
                date(title.due_date),
                title.id
            ))
        }
        TitleCommand::Pay { id, amount, method } => {
            let title = find(state, kind, &id).await?;
            let settled = titles.pay(&title.id, amount, method, session.user_id()).await?;
            info!(title = %title.id, amount = %amount, status = ?settled.title.status, "Title payment");
            Ok(format!(
                "Pagamento de {} registrado. Em aberto: {} ({}).",
                amount,
                settled.title.open_balance(),
                settled.title.status.label()
            ))
        }
        TitleCommand::Cancel { id } => {
            let title = find(state, kind, &id).await?;
            titles.cancel(&title.id).await?;
            Ok(format!("Conta {} cancelada.", title.description))
        }
    }
}

/// A title of the group's kind. One of the other kind is reported as missing.
async fn find(state: &AppState, kind: TitleKind, id: &str) -> AppResult<Title> {
    state
        .db()
        .titles()
        .get_by_id(id.trim())
        .await?
        .filter(|t| t.kind == kind)
        .ok_or_else(|| AppError::not_found("Conta", id))
}

fn status_of(title: &Title) -> String {
    if title.is_overdue(today()) {
        format!("{} (vencida)", title.status.label())
    } else {
        title.status.label().to_string()
    }
}

async fn person_name(state: &AppState, title: &Title) -> AppResult<Option<String>> {
    match &title.person_id {
        Some(id) => Ok(state
            .db()
            .people()
            .get_by_id(id)
            .await?
            .map(|p| p.display_name().to_string())),
        None => Ok(None),
    }
}

async fn render_list(state: &AppState, list: &[Title]) -> AppResult<String> {
    let mut table = Table::new(&[
        ("Vencimento", Align::Left),
        ("Descrição", Align::Left),
        ("Pessoa", Align::Left),
        ("Em aberto", Align::Right),
        ("Situação", Align::Left),
        ("Id", Align::Left),
    ]);
    let mut open = Money::zero();
    for title in list {
        if title.status.accepts_payment() {
            open += title.open_balance();
        }
        table.row([
            date(title.due_date),
            title.description.clone(),
            person_name(state, title).await?.unwrap_or_else(|| "-".into()),
            title.open_balance().to_string(),
            status_of(title),
            title.id.clone(),
        ]);
    }
    Ok(format!("{}\n\nTotal em aberto: {}", table.render(), open))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;
    use chrono::Duration;
    use pdv_core::{Module, PaymentMethod, TitleStatus};

    async fn add(state: &AppState, session: &Session, kind: TitleKind, days: i64) -> Title {
        run(
            state,
            session,
            kind,
            TitleCommand::Add {
                description: "Boleto distribuidora".into(),
                amount: Money::from_cents(30_000),
                due: today() + Duration::days(days),
                person: None,
            },
        )
        .await
        .unwrap();
        state
            .db()
            .titles()
            .list(&TitleFilter::new(kind, today()))
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Payables]).await;
        let title = add(&state, &clerk, TitleKind::Payable, 10).await;

        let out = run(
            &state,
            &clerk,
            TitleKind::Payable,
            TitleCommand::Pay {
                id: title.id.clone(),
                amount: Money::from_cents(10_000),
                method: PaymentMethod::Pix,
            },
        )
        .await
        .unwrap();
        assert!(out.contains("Em aberto: R$ 200,00 (parcial)"));

        run(
            &state,
            &clerk,
            TitleKind::Payable,
            TitleCommand::Pay {
                id: title.id.clone(),
                amount: Money::from_cents(20_000),
                method: PaymentMethod::Pix,
            },
        )
        .await
        .unwrap();
        let shown = run(
            &state,
            &clerk,
            TitleKind::Payable,
            TitleCommand::Show { id: title.id.clone() },
        )
        .await
        .unwrap();
        assert!(shown.contains("Situação:    pago"));
        assert_eq!(shown.matches("PIX").count(), 2);
    }

    #[tokio::test]
    async fn test_overdue_filter() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Receivables]).await;
        add(&state, &clerk, TitleKind::Receivable, -3).await;

        let out = run(
            &state,
            &clerk,
            TitleKind::Receivable,
            TitleCommand::List {
                status: Some(TitleStatus::Open),
                overdue: true,
                person: None,
            },
        )
        .await
        .unwrap();
        assert!(out.contains("(vencida)"));
        assert!(out.ends_with("Total em aberto: R$ 300,00"));
    }

    #[tokio::test]
    async fn test_kinds_do_not_mix() {
        let state = testing::state().await;
        let admin = testing::admin(&state).await;
        let title = add(&state, &admin, TitleKind::Payable, 5).await;

        let err = run(
            &state,
            &admin,
            TitleKind::Receivable,
            TitleCommand::Cancel { id: title.id },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_receivable_needs_customer() {
        let state = testing::state().await;
        let admin = testing::admin(&state).await;
        let supplier = testing::supplier(&state, "Distribuidora Norte").await;

        let receivable = |person: String| TitleCommand::Add {
            description: "Parcela 1/3".into(),
            amount: Money::from_cents(5_000),
            due: today(),
            person: Some(person),
        };
        let err = run(&state, &admin, TitleKind::Receivable, receivable(supplier.id))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let maria = testing::customer(&state, "Maria", None).await;
        run(&state, &admin, TitleKind::Receivable, receivable(maria.id))
            .await
            .unwrap();
    }
}
