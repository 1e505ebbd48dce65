//! # Seed Data Generator
//!
//! Populates a database with demo products and customers.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default) and 20 customers
//! cargo run -p pdv-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p pdv-db --bin seed -- --count 2000 --db ./data/pdv.db
//! ```
//!
//! Products get a code `{CATEGORIA}-{NNNN}`, a valid EAN-13 barcode with the
//! Brazilian 789 prefix, a price between R$ 1,99 and R$ 29,99 and stock 0..100.

use chrono::Utc;
use std::env;
use uuid::Uuid;

use pdv_core::{Money, Person, PersonKind, Product};
use pdv_db::{Database, DbConfig};

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "MERC",
        &[
            "Arroz Branco",
            "Arroz Integral",
            "Feijão Carioca",
            "Feijão Preto",
            "Macarrão Espaguete",
            "Farinha de Mandioca",
            "Açúcar Cristal",
            "Sal Refinado",
            "Óleo de Soja",
            "Café Torrado",
            "Molho de Tomate",
            "Fubá",
        ],
    ),
    (
        "BEB",
        &[
            "Refrigerante Cola",
            "Guaraná",
            "Água Mineral",
            "Suco de Laranja",
            "Suco de Uva",
            "Cerveja Pilsen",
            "Chá Mate",
            "Energético",
        ],
    ),
    (
        "LAT",
        &[
            "Leite Integral",
            "Leite Desnatado",
            "Queijo Mussarela",
            "Requeijão",
            "Manteiga",
            "Iogurte Natural",
            "Creme de Leite",
            "Leite Condensado",
        ],
    ),
    (
        "LIM",
        &[
            "Detergente",
            "Sabão em Pó",
            "Água Sanitária",
            "Desinfetante",
            "Esponja",
            "Amaciante",
        ],
    ),
    (
        "HIG",
        &[
            "Sabonete",
            "Creme Dental",
            "Papel Higiênico",
            "Xampu",
            "Desodorante",
        ],
    ),
];

const SIZES: &[(&str, i64)] = &[
    ("500g", 0),
    ("1kg", 150),
    ("2kg", 400),
    ("5kg", 1_200),
    ("350ml", 0),
    ("1L", 200),
    ("2L", 450),
];

const CUSTOMERS: &[&str] = &[
    "Maria da Silva",
    "José Santos",
    "Ana Oliveira",
    "João Souza",
    "Francisca Lima",
    "Antônio Pereira",
    "Adriana Costa",
    "Carlos Ferreira",
    "Juliana Rodrigues",
    "Paulo Almeida",
    "Márcia Nascimento",
    "Lucas Araújo",
    "Fernanda Ribeiro",
    "Marcos Carvalho",
    "Patrícia Gomes",
    "Rafael Martins",
    "Aline Rocha",
    "Bruno Barbosa",
    "Camila Dias",
    "Pedro Teixeira",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./pdv_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Balcão PDV - dados de demonstração");
                println!();
                println!("Uso: seed [OPÇÕES]");
                println!();
                println!("Opções:");
                println!("  -c, --count <N>    Quantidade de produtos (padrão: 500)");
                println!("  -d, --db <PATH>    Arquivo do banco (padrão: ./pdv_dev.db)");
                println!("  -h, --help         Mostra esta ajuda");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Balcão PDV - dados de demonstração");
    println!("==================================");
    println!("Banco:    {}", db_path);
    println!("Produtos: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Banco aberto, migrações aplicadas");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ O banco já tem {} produtos; nada foi gerado.", existing);
        println!("  Apague o arquivo para gerar novamente.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut seq = 0usize;

    'outer: for (category, names) in CATEGORIES {
        for name in names.iter() {
            for (size, addon) in SIZES {
                if generated >= count {
                    break 'outer;
                }
                seq += 1;
                let product = generate_product(category, name, size, *addon, seq);
                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Falha ao inserir {}: {}", product.code, e);
                    continue;
                }
                generated += 1;
                if generated % 100 == 0 {
                    println!("  {} produtos...", generated);
                }
            }
        }
    }

    let mut customers = 0;
    for (idx, name) in CUSTOMERS.iter().enumerate() {
        let now = Utc::now();
        let person = Person {
            id: Uuid::new_v4().to_string(),
            kind: PersonKind::Customer,
            name: name.to_string(),
            trade_name: None,
            document: None,
            email: None,
            phone: Some(format!("1199{:07}", 1_000_000 + idx * 7_919)),
            address: Default::default(),
            credit_limit_cents: if idx % 3 == 0 { 50_000 } else { 0 },
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        match db.people().insert(&person).await {
            Ok(_) => customers += 1,
            Err(e) => eprintln!("Falha ao inserir {}: {}", person.name, e),
        }
    }

    println!();
    println!("✓ {} produtos e {} clientes em {:?}", generated, customers, start.elapsed());

    let found = db.products().search("arroz", 10).await?;
    println!("  Busca 'arroz': {} resultados", found.len());
    println!();
    println!("✓ Concluído!");

    Ok(())
}

fn generate_product(category: &str, name: &str, size: &str, addon: i64, seq: usize) -> Product {
    let now = Utc::now();

    let price_cents = 199 + ((seq * 37) % 1_000) as i64 + addon;
    let cost_pct = 55 + (seq % 25) as i64;

    Product {
        id: Uuid::new_v4().to_string(),
        code: format!("{}-{:04}", category, seq),
        barcode: Some(ean13(&format!("789{:09}", seq))),
        name: format!("{} {}", name, size),
        unit: "UN".to_string(),
        price_cents,
        cost_cents: Money::from_cents(price_cents).percentage((cost_pct * 100) as u32).cents(),
        stock_quantity: (seq % 101) as i64,
        min_stock: 5,
        track_inventory: true,
        allow_negative_stock: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Appends the EAN-13 check digit to 12 digits.
fn ean13(first12: &str) -> String {
    let sum: u32 = first12
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    format!("{}{}", first12, (10 - sum % 10) % 10)
}
