//! # Balcão PDV
//!
//! Command-line front end of the point of sale.
//!
//! ## Module Structure
//! ```text
//! pdv/
//! ├── cli.rs         # clap definitions
//! ├── config.rs      # pdv.toml: database, printer, store, update, lookup
//! ├── error.rs       # AppError and exit codes
//! ├── output.rs      # Tables and formatting helpers
//! ├── startup.rs     # Background startup worker with step events
//! ├── state/         # AppState (config + database) and Session (operator)
//! └── commands/      # One module per command group
//! ```
//!
//! ## Invocation
//! ```text
//! ┌──────────┐   ┌─────────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ parse    │──►│ startup worker  │──►│ login        │──►│ dispatch command │
//! │ (clap)   │   │ (5 steps)       │   │ (-u / -p)    │   │ print result     │
//! └──────────┘   └─────────────────┘   └──────────────┘   └──────────────────┘
//!      │
//!      └── `pdv config ...` skips startup and login
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod startup;
pub mod state;

use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use error::{AppError, AppResult};
use pdv_core::Version;
use pdv_update::UpdateStatus;
use startup::{StartupOptions, INITIAL_ADMIN_PASSWORD};
use state::Session;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the running build, compared against published releases.
pub fn current_version() -> AppResult<Version> {
    Version::parse(VERSION).map_err(|e| AppError::internal(format!("Versão inválida {}: {}", VERSION, e)))
}

/// Parses the command line, runs the command and maps the outcome to an
/// exit code.
pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Erro: {}", e.message);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn execute(cli: Cli) -> AppResult<String> {
    let Cli {
        config,
        db,
        user,
        password,
        verbose,
        command,
    } = cli;

    let command = match command {
        Command::Config(cmd) => return commands::config::run(config, db, cmd),
        other => other,
    };

    let show_steps = verbose || matches!(command, Command::Login);
    let startup = startup::run(StartupOptions {
        config_path: config,
        db_path: db,
        check_update: None,
    })
    .wait(|index, total, step| {
        if show_steps {
            eprintln!("[{}/{}] {}", index, total, step.label());
        }
    })
    .await?;

    if let Some(admin) = &startup.created_admin {
        warn!(username = %admin.username, "Initial administrator created");
        eprintln!(
            "Usuário {} criado com a senha \"{}\". Altere-a com `pdv user password`.",
            admin.username, INITIAL_ADMIN_PASSWORD
        );
    }
    if let Some(UpdateStatus::Available { version, .. }) = &startup.update {
        eprintln!("Nova versão {} disponível: `pdv update install`.", version);
    }

    let mut state = startup.state;
    let session = Session::login(
        &state,
        user.as_deref().unwrap_or_default(),
        password.as_deref().unwrap_or_default(),
    )
    .await?;
    info!(user = %session.display_name(), "Operator logged in");

    let result = commands::dispatch(&mut state, &session, command).await;
    state.db().close().await;
    result
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug,sqlx=info")
        } else {
            EnvFilter::new("warn,pdv=info,sqlx=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the command tests.

    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::config::AppConfig;
    use crate::startup::INITIAL_ADMIN_PASSWORD;
    use crate::state::{AppState, Session};
    use pdv_core::{Module, Person, PersonKind, Product};
    use pdv_db::{Database, DbConfig};

    pub const ADMIN: &str = "admin";
    pub const PASSWORD: &str = INITIAL_ADMIN_PASSWORD;
    pub const OPERATOR: &str = "caixa";

    pub async fn state() -> AppState {
        state_with(AppConfig::default()).await
    }

    /// In-memory database with the first-run administrator.
    pub async fn state_with(config: AppConfig) -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().ensure_admin(PASSWORD).await.unwrap();
        AppState::new(config, db, None)
    }

    pub async fn admin(state: &AppState) -> Session {
        Session::login(state, ADMIN, PASSWORD).await.unwrap()
    }

    /// Creates the `caixa` login with `modules` and logs it in.
    pub async fn operator(state: &AppState, modules: &[Module]) -> Session {
        let users = state.db().users();
        let user = users.create(OPERATOR, PASSWORD, None, false).await.unwrap();
        for module in modules {
            users.grant(&user.id, *module).await.unwrap();
        }
        Session::login(state, OPERATOR, PASSWORD).await.unwrap()
    }

    fn person(kind: PersonKind, name: &str, document: Option<&str>) -> Person {
        let now = Utc::now();
        Person {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            name: name.to_string(),
            trade_name: None,
            document: document.map(str::to_string),
            email: None,
            phone: None,
            address: Default::default(),
            credit_limit_cents: 0,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn customer(state: &AppState, name: &str, document: Option<&str>) -> Person {
        let p = person(PersonKind::Customer, name, document);
        state.db().people().insert(&p).await.unwrap()
    }

    pub async fn supplier(state: &AppState, name: &str) -> Person {
        let p = person(PersonKind::Supplier, name, None);
        state.db().people().insert(&p).await.unwrap()
    }

    pub async fn product(state: &AppState, code: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        let p = Product {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.to_string(),
            barcode: None,
            name: format!("Produto {}", code),
            unit: "UN".to_string(),
            price_cents,
            cost_cents: price_cents / 2,
            stock_quantity: stock,
            min_stock: 0,
            track_inventory: true,
            allow_negative_stock: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.db().products().insert(&p).await.unwrap()
    }

    /// Serves `(path, status, body)` routes on loopback until the test ends;
    /// unknown paths get 404. Returns the base URL.
    pub async fn serve(routes: Vec<(&'static str, u16, &str)>) -> String {
        let routes: Vec<(&'static str, u16, Vec<u8>)> = routes
            .into_iter()
            .map(|(path, status, body)| (path, status, body.as_bytes().to_vec()))
            .collect();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();

                let (status, body) = routes
                    .iter()
                    .find(|(p, _, _)| *p == path)
                    .map(|(_, status, body)| (*status, body.clone()))
                    .unwrap_or((404, b"{\"message\":\"Not Found\"}".to_vec()));

                let header = format!(
                    "HTTP/1.1 {} X\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }
}
