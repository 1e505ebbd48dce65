//! # Sale Commands
//!
//! ## Checkout Flow
//! ```text
//! items ──► find_for_sale ──► Cart::add ──► discount / customer
//!                                               │
//!                                               ▼
//!                          payments ──► Cart::tender ──► Tender
//!                                               │
//!                                               ▼
//!                                  sales().finalize(NewSale)
//!                                               │
//!                                 ┌─────────────┴─────────────┐
//!                                 ▼                           ▼
//!                          receipt on printer          summary text
//!                        (failure only warns)
//! ```
//!
//! The sale is recorded before anything is printed. A printer that is off
//! or out of paper never undoes a sale; the receipt can be reprinted.

use tracing::{info, warn};

use super::find_customer;
use crate::cli::{CheckoutArgs, SaleCommand};
use crate::error::{AppError, AppResult};
use crate::output::{date, datetime, today, Align, Table};
use crate::state::{AppState, Session};
use pdv_core::{Cart, Money, PaymentMethod, Person, SaleStatus};
use pdv_db::{NewSale, SaleDetail, SaleFilter};
use pdv_print::ReceiptLayout;

/// Columns used when a receipt is shown on screen.
const SCREEN_COLUMNS: usize = 48;

pub async fn run(state: &AppState, session: &Session, cmd: SaleCommand) -> AppResult<String> {
    match cmd {
        SaleCommand::Checkout(args) => checkout(state, session, args).await,
        SaleCommand::Show { key } => {
            let detail = state.db().sales().detail(&key).await?;
            let customer = customer_of(state, &detail).await?;
            let receipt = state.receipt(&detail, &operator_of(state, &detail).await?, customer.as_ref());
            let mut lines = ReceiptLayout::new(SCREEN_COLUMNS).render_text(&receipt);
            if let Some(reason) = &detail.sale.cancel_reason {
                lines.push(format!("Motivo do cancelamento: {}", reason));
            }
            Ok(lines.join("\n"))
        }
        SaleCommand::List {
            from,
            to,
            customer,
            cancelled,
            limit,
        } => {
            let customer_id = match customer {
                Some(key) => Some(find_customer(state, &key).await?.id),
                None => None,
            };
            let filter = SaleFilter {
                from,
                to,
                customer_id,
                status: cancelled.then_some(SaleStatus::Cancelled),
                limit: Some(limit),
            };
            let sales = state.db().sales().list(&filter).await?;
            if sales.is_empty() {
                return Ok("Nenhuma venda encontrada.".into());
            }
            let mut table = Table::new(&[
                ("Cupom", Align::Left),
                ("Data", Align::Left),
                ("Total", Align::Right),
                ("Situação", Align::Left),
            ]);
            let mut total = Money::zero();
            for sale in &sales {
                if !sale.is_cancelled() {
                    total += sale.total();
                }
                table.row([
                    sale.receipt_number.clone(),
                    datetime(sale.created_at),
                    sale.total().to_string(),
                    sale.status.label().to_string(),
                ]);
            }
            Ok(format!(
                "{}\n\n{} venda(s), total {}",
                table.render(),
                sales.len(),
                total
            ))
        }
        SaleCommand::Cancel { key, reason } => {
            let detail = state.db().sales().detail(&key).await?;
            let sale = state
                .db()
                .sales()
                .cancel(&detail.sale.id, &reason, session.user_id())
                .await?;
            info!(receipt = %sale.receipt_number, by = %session.operator().user.username, "Sale cancelled");
            Ok(format!(
                "Venda {} cancelada. Estoque e pagamentos estornados.",
                sale.receipt_number
            ))
        }
        SaleCommand::Reprint { key, printer } => {
            let detail = state.db().sales().detail(&key).await?;
            let customer = customer_of(state, &detail).await?;
            let receipt = state.receipt(&detail, &operator_of(state, &detail).await?, customer.as_ref());
            let printer = state.printer(printer.as_deref()).await?;
            printer.print_receipt(&receipt).await?;
            Ok(format!(
                "Cupom {} reimpresso em {}.",
                detail.sale.receipt_number,
                printer.name()
            ))
        }
        SaleCommand::Summary { date: day } => {
            let day = day.unwrap_or_else(today);
            let summary = state.db().sales().daily_summary(day).await?;
            let mut out = vec![
                format!("Resumo de {}", date(summary.date)),
                format!("Vendas:       {}", summary.sale_count),
                format!("Canceladas:   {}", summary.cancelled_count),
                format!("Bruto:        {}", summary.subtotal),
                format!("Descontos:    {}", summary.discount),
                format!("Líquido:      {}", summary.total),
            ];
            if !summary.by_method.is_empty() {
                out.push(String::new());
                let mut table = Table::new(&[("Forma", Align::Left), ("Valor", Align::Right)]);
                for (method, amount) in &summary.by_method {
                    table.row([method.label().to_string(), amount.to_string()]);
                }
                out.push(table.render());
            }
            Ok(out.join("\n"))
        }
    }
}

async fn checkout(state: &AppState, session: &Session, args: CheckoutArgs) -> AppResult<String> {
    let products = state.db().products();

    let mut cart = Cart::new();
    for item in &args.items {
        let product = products.find_for_sale(&item.key).await?;
        cart.add(&product, item.quantity)?;
    }

    let customer = match &args.customer {
        Some(key) => Some(find_customer(state, key).await?),
        None => None,
    };
    cart.set_customer(customer.as_ref().map(|c| c.id.clone()));
    if let Some(discount) = args.discount {
        cart.set_discount(discount)?;
    }

    // A fully discounted or free sale settles with no payment at all
    let payments: Vec<(PaymentMethod, Money)> = if args.payments.is_empty() {
        if cart.total().is_zero() {
            Vec::new()
        } else {
            vec![(PaymentMethod::Cash, cart.total())]
        }
    } else {
        args.payments.iter().map(|p| (p.method, p.amount)).collect()
    };
    let tender = cart.tender(&payments)?;

    let mut new_sale = NewSale::from_checkout(&cart, tender, session.user_id());
    if let Some(notes) = &args.notes {
        new_sale = new_sale.with_notes(notes.as_str());
    }
    let detail = state.db().sales().finalize(new_sale).await?;
    info!(
        receipt = %detail.sale.receipt_number,
        total = %detail.sale.total(),
        items = detail.items.len(),
        "Checkout completed"
    );

    let mut out = vec![
        format!("Venda {} registrada.", detail.sale.receipt_number),
        format!("Total: {}", detail.sale.total()),
    ];
    if detail.sale.discount_cents > 0 {
        out.push(format!("Desconto: {}", Money::from_cents(detail.sale.discount_cents)));
    }
    if detail.sale.change_cents > 0 {
        out.push(format!("Troco: {}", Money::from_cents(detail.sale.change_cents)));
    }

    if args.print || args.printer.is_some() {
        let receipt = state.receipt(&detail, session.display_name(), customer.as_ref());
        let printed = match state.printer(args.printer.as_deref()).await {
            Ok(printer) => printer.print_receipt(&receipt).await.map_err(AppError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = printed {
            warn!(receipt = %detail.sale.receipt_number, error = %e, "Receipt not printed");
            out.push(format!(
                "Cupom não impresso: {}. Use `pdv sale reprint {}`.",
                e.message, detail.sale.receipt_number
            ));
        }
    }
    Ok(out.join("\n"))
}

async fn customer_of(state: &AppState, detail: &SaleDetail) -> AppResult<Option<Person>> {
    match &detail.sale.customer_id {
        Some(id) => Ok(state.db().people().get_by_id(id).await?),
        None => Ok(None),
    }
}

/// Who made the sale, as printed on the receipt.
async fn operator_of(state: &AppState, detail: &SaleDetail) -> AppResult<String> {
    let user = state.db().users().get_by_id(&detail.sale.user_id).await?;
    Ok(user
        .map(|u| u.username)
        .unwrap_or_else(|| detail.sale.user_id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ItemArg, PaymentArg};
    use crate::error::ErrorCode;
    use crate::testing;
    use pdv_core::{Discount, Module, PrinterConfig, PrinterTransportKind};

    fn items(list: &[(&str, i64)]) -> Vec<ItemArg> {
        list.iter()
            .map(|(key, quantity)| ItemArg {
                key: key.to_string(),
                quantity: *quantity,
            })
            .collect()
    }

    fn checkout_args(list: &[(&str, i64)], payments: Vec<PaymentArg>) -> CheckoutArgs {
        CheckoutArgs {
            items: items(list),
            payments,
            discount: None,
            customer: None,
            notes: None,
            print: false,
            printer: None,
        }
    }

    fn cash(cents: i64) -> PaymentArg {
        PaymentArg {
            method: PaymentMethod::Cash,
            amount: Money::from_cents(cents),
        }
    }

    #[tokio::test]
    async fn test_checkout_with_change_updates_stock() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales]).await;
        testing::product(&state, "ARROZ-5KG", 2590, 10).await;

        let out = run(
            &state,
            &clerk,
            SaleCommand::Checkout(checkout_args(&[("ARROZ-5KG", 2)], vec![cash(6000)])),
        )
        .await
        .unwrap();
        assert!(out.contains("Total: R$ 51,80"));
        assert!(out.contains("Troco: R$ 8,20"));

        let product = state.db().products().get_by_code("ARROZ-5KG").await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 8);
    }

    #[tokio::test]
    async fn test_checkout_without_payments_is_exact_cash() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales]).await;
        testing::product(&state, "SAL-1KG", 350, 5).await;

        let mut args = checkout_args(&[("SAL-1KG", 1)], Vec::new());
        args.discount = Some(Discount::Amount(Money::from_cents(50)));
        let out = run(&state, &clerk, SaleCommand::Checkout(args)).await.unwrap();
        assert!(out.contains("Total: R$ 3,00"));
        assert!(out.contains("Desconto: R$ 0,50"));
        assert!(!out.contains("Troco"));
    }

    #[tokio::test]
    async fn test_fully_discounted_checkout_needs_no_payment() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales]).await;
        testing::product(&state, "SAL-1KG", 350, 5).await;

        let mut args = checkout_args(&[("SAL-1KG", 1)], Vec::new());
        args.discount = Some(Discount::Percent(10_000));
        let out = run(&state, &clerk, SaleCommand::Checkout(args)).await.unwrap();
        assert!(out.contains("Total: R$ 0,00"));

        let sales = state.db().sales().list(&SaleFilter::default()).await.unwrap();
        assert_eq!(sales.len(), 1);
        let detail = state.db().sales().detail(&sales[0].id).await.unwrap();
        assert!(detail.payments.is_empty());
        assert_eq!(detail.sale.paid_cents, 0);

        let product = state.db().products().get_by_code("SAL-1KG").await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 4);
    }

    #[tokio::test]
    async fn test_store_credit_needs_customer() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales]).await;
        testing::product(&state, "SAL-1KG", 350, 5).await;

        let fiado = PaymentArg {
            method: PaymentMethod::StoreCredit,
            amount: Money::from_cents(350),
        };
        let err = run(
            &state,
            &clerk,
            SaleCommand::Checkout(checkout_args(&[("SAL-1KG", 1)], vec![fiado])),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let maria = testing::customer(&state, "Maria", Some("529.982.247-25")).await;
        let mut args = checkout_args(&[("SAL-1KG", 1)], vec![fiado]);
        args.customer = Some(maria.id.clone());
        run(&state, &clerk, SaleCommand::Checkout(args)).await.unwrap();
        assert_eq!(
            state.db().accounts().balance(&maria.id).await.unwrap(),
            Money::from_cents(350)
        );
    }

    #[tokio::test]
    async fn test_insufficient_stock_records_nothing() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales]).await;
        testing::product(&state, "OLEO-900", 799, 1).await;

        let err = run(
            &state,
            &clerk,
            SaleCommand::Checkout(checkout_args(&[("OLEO-900", 3)], Vec::new())),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let list = run(
            &state,
            &clerk,
            SaleCommand::List {
                from: None,
                to: None,
                customer: None,
                cancelled: false,
                limit: 10,
            },
        )
        .await
        .unwrap();
        assert_eq!(list, "Nenhuma venda encontrada.");
    }

    #[tokio::test]
    async fn test_show_cancel_and_summary() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales]).await;
        testing::product(&state, "CAFE-500", 1890, 20).await;

        run(
            &state,
            &clerk,
            SaleCommand::Checkout(checkout_args(&[("CAFE-500", 1)], Vec::new())),
        )
        .await
        .unwrap();
        let sale = state
            .db()
            .sales()
            .list(&SaleFilter::default())
            .await
            .unwrap()
            .remove(0);

        let shown = run(
            &state,
            &clerk,
            SaleCommand::Show {
                key: sale.receipt_number.clone(),
            },
        )
        .await
        .unwrap();
        assert!(shown.contains("CAFE-500"));
        assert!(shown.contains(testing::OPERATOR));

        run(
            &state,
            &clerk,
            SaleCommand::Cancel {
                key: sale.receipt_number.clone(),
                reason: "cliente desistiu".into(),
            },
        )
        .await
        .unwrap();
        let shown = run(
            &state,
            &clerk,
            SaleCommand::Show {
                key: sale.id.clone(),
            },
        )
        .await
        .unwrap();
        assert!(shown.contains("cliente desistiu"));

        let summary = run(&state, &clerk, SaleCommand::Summary { date: None })
            .await
            .unwrap();
        assert!(summary.contains("Canceladas:   1"));
        assert!(summary.contains("Vendas:       0"));
    }

    #[tokio::test]
    async fn test_print_failure_keeps_sale() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales]).await;
        testing::product(&state, "SAL-1KG", 350, 5).await;

        let mut args = checkout_args(&[("SAL-1KG", 1)], Vec::new());
        args.print = true;
        let out = run(&state, &clerk, SaleCommand::Checkout(args)).await.unwrap();
        assert!(out.contains("registrada"));
        assert!(out.contains("Cupom não impresso"));
    }

    #[tokio::test]
    async fn test_checkout_prints_to_file_printer() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales]).await;
        testing::product(&state, "SAL-1KG", 350, 5).await;

        let dir = tempfile::tempdir().unwrap();
        let spool = dir.path().join("cupom.bin");
        let mut printer = PrinterConfig::new(
            "balcao",
            PrinterTransportKind::File {
                path: spool.display().to_string(),
            },
        );
        printer.is_default = true;
        state.db().printers().upsert(&printer).await.unwrap();

        let mut args = checkout_args(&[("SAL-1KG", 1)], Vec::new());
        args.print = true;
        let out = run(&state, &clerk, SaleCommand::Checkout(args)).await.unwrap();
        assert!(!out.contains("não impresso"));
        assert!(!std::fs::read(&spool).unwrap().is_empty());
    }
}
