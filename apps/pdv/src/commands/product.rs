//! # Product Commands
//!
//! ```text
//! pdv product search arroz
//! pdv product add ARROZ-5KG "Arroz Branco 5kg" 25,90 --barcode 7891234567895 --stock 40
//! pdv product stock ARROZ-5KG -- -2
//! ```

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{clean, find_product};
use crate::cli::{ProductArgs, ProductChanges, ProductCommand};
use crate::error::AppResult;
use crate::output::{datetime, opt, yes_no, Align, Table};
use crate::state::AppState;
use pdv_core::{Money, Product};

pub async fn run(state: &AppState, cmd: ProductCommand) -> AppResult<String> {
    let products = state.db().products();
    match cmd {
        ProductCommand::Search { query, limit } => {
            let found = products.search(&query, limit).await?;
            Ok(list(&found))
        }
        ProductCommand::Show { key } => {
            let product = find_product(state, &key).await?;
            Ok(details(&product))
        }
        ProductCommand::Add(args) => {
            let product = products.insert(&new_product(args)).await?;
            info!(code = %product.code, "Product registered");
            Ok(format!("Produto {} cadastrado.", product.code))
        }
        ProductCommand::Update { key, changes } => {
            let mut product = find_product(state, &key).await?;
            apply(&mut product, changes);
            products.update(&product).await?;
            Ok(format!("Produto {} atualizado.", product.code))
        }
        ProductCommand::Stock { key, delta } => {
            let product = find_product(state, &key).await?;
            let stock = products.adjust_stock(&product.id, delta).await?;
            info!(code = %product.code, delta, stock, "Stock adjusted");
            Ok(format!("Estoque de {}: {} {}", product.code, stock, product.unit))
        }
        ProductCommand::Remove { key } => {
            let product = find_product(state, &key).await?;
            products.soft_delete(&product.id).await?;
            Ok(format!("Produto {} desativado.", product.code))
        }
        ProductCommand::LowStock { limit } => {
            let found = products.low_stock(limit).await?;
            if found.is_empty() {
                return Ok("Nenhum produto abaixo do estoque mínimo.".into());
            }
            Ok(list(&found))
        }
    }
}

fn new_product(args: ProductArgs) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        code: args.code.trim().to_uppercase(),
        barcode: clean(args.barcode),
        name: args.name.trim().to_string(),
        unit: args.unit.trim().to_uppercase(),
        price_cents: args.price.cents(),
        cost_cents: args.cost.unwrap_or_else(Money::zero).cents(),
        stock_quantity: args.stock,
        min_stock: args.min_stock,
        track_inventory: !args.no_track,
        allow_negative_stock: args.allow_negative,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn apply(product: &mut Product, changes: ProductChanges) {
    if let Some(name) = changes.name {
        product.name = name.trim().to_string();
    }
    if let Some(price) = changes.price {
        product.price_cents = price.cents();
    }
    if let Some(cost) = changes.cost {
        product.cost_cents = cost.cents();
    }
    if let Some(barcode) = changes.barcode {
        product.barcode = clean(Some(barcode));
    }
    if let Some(unit) = changes.unit {
        product.unit = unit.trim().to_uppercase();
    }
    if let Some(min) = changes.min_stock {
        product.min_stock = min;
    }
    product.updated_at = Utc::now();
}

fn list(products: &[Product]) -> String {
    if products.is_empty() {
        return "Nenhum produto encontrado.".into();
    }
    let mut table = Table::new(&[
        ("Código", Align::Left),
        ("Descrição", Align::Left),
        ("Un", Align::Left),
        ("Preço", Align::Right),
        ("Estoque", Align::Right),
    ]);
    for p in products {
        let stock = if p.track_inventory {
            let mark = if p.is_below_minimum() { " !" } else { "" };
            format!("{}{}", p.stock_quantity, mark)
        } else {
            "-".to_string()
        };
        table.row([
            p.code.clone(),
            p.name.clone(),
            p.unit.clone(),
            p.price().to_string(),
            stock,
        ]);
    }
    table.render()
}

fn details(p: &Product) -> String {
    [
        format!("Código:        {}", p.code),
        format!("Código barras: {}", opt(p.barcode.as_deref())),
        format!("Descrição:     {}", p.name),
        format!("Unidade:       {}", p.unit),
        format!("Preço:         {}", p.price()),
        format!("Custo:         {}", p.cost()),
        format!("Margem:        {:.2}%", p.margin_bps() as f64 / 100.0),
        format!("Estoque:       {} (mínimo {})", p.stock_quantity, p.min_stock),
        format!("Controla est.: {}", yes_no(p.track_inventory)),
        format!("Ativo:         {}", yes_no(p.is_active)),
        format!("Alterado em:   {}", datetime(p.updated_at)),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn args(code: &str, price: i64) -> ProductArgs {
        ProductArgs {
            code: code.into(),
            name: "Feijão Carioca 1kg".into(),
            price: Money::from_cents(price),
            cost: Some(Money::from_cents(550)),
            barcode: None,
            unit: "un".into(),
            stock: 12,
            min_stock: 15,
            no_track: false,
            allow_negative: false,
        }
    }

    #[tokio::test]
    async fn test_add_search_and_low_stock() {
        let state = testing::state().await;
        run(&state, ProductCommand::Add(args("feijao-1kg", 899)))
            .await
            .unwrap();

        let out = run(
            &state,
            ProductCommand::Search {
                query: "feij".into(),
                limit: 10,
            },
        )
        .await
        .unwrap();
        assert!(out.contains("FEIJAO-1KG"));
        assert!(out.contains("R$ 8,99"));
        assert!(out.contains("12 !"));

        let low = run(&state, ProductCommand::LowStock { limit: 10 }).await.unwrap();
        assert!(low.contains("FEIJAO-1KG"));
    }

    #[tokio::test]
    async fn test_update_and_stock() {
        let state = testing::state().await;
        testing::product(&state, "ARROZ-5KG", 2590, 10).await;

        run(
            &state,
            ProductCommand::Update {
                key: "ARROZ-5KG".into(),
                changes: ProductChanges {
                    price: Some(Money::from_cents(2790)),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();
        let out = run(
            &state,
            ProductCommand::Stock {
                key: "ARROZ-5KG".into(),
                delta: -3,
            },
        )
        .await
        .unwrap();
        assert!(out.contains(": 7"));

        let shown = run(
            &state,
            ProductCommand::Show {
                key: "ARROZ-5KG".into(),
            },
        )
        .await
        .unwrap();
        assert!(shown.contains("R$ 27,90"));
    }

    #[tokio::test]
    async fn test_remove_hides_from_search() {
        let state = testing::state().await;
        testing::product(&state, "SAL-1KG", 350, 5).await;
        run(&state, ProductCommand::Remove { key: "SAL-1KG".into() })
            .await
            .unwrap();
        let out = run(
            &state,
            ProductCommand::Search {
                query: "SAL".into(),
                limit: 10,
            },
        )
        .await
        .unwrap();
        assert_eq!(out, "Nenhum produto encontrado.");
    }
}
