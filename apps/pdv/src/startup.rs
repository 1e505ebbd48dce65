//! # Startup Worker
//!
//! Brings the terminal up on a background task and reports each step over a
//! channel, so the front end can show progress while the database migrates
//! or the update server is slow to answer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Startup Sequence                                  │
//! │                                                                         │
//! │  [1/5] LoadConfig     defaults → pdv.toml → env → --db                 │
//! │  [2/5] OpenDatabase   pool + embedded migrations                       │
//! │  [3/5] EnsureAdmin    first run creates the `admin` login              │
//! │  [4/5] LoadCompany    store registration for receipt headers           │
//! │  [5/5] CheckUpdate    only with [update] check_on_startup = true;      │
//! │                       failures are logged, never fatal                 │
//! │                                                                         │
//! │  worker task ──StartupEvent::Step──► front end (progress lines)        │
//! │              ──StartupEvent::Done──► AppState ready                    │
//! │              ──StartupEvent::Failed─► exit with the error's code       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use pdv_core::User;
use pdv_db::{Database, DbConfig};
use pdv_update::{ReleaseClient, UpdateStatus};

/// Password of the login created on first run.
pub const INITIAL_ADMIN_PASSWORD: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStep {
    LoadConfig,
    OpenDatabase,
    EnsureAdmin,
    LoadCompany,
    CheckUpdate,
}

impl StartupStep {
    pub const ALL: [StartupStep; 5] = [
        StartupStep::LoadConfig,
        StartupStep::OpenDatabase,
        StartupStep::EnsureAdmin,
        StartupStep::LoadCompany,
        StartupStep::CheckUpdate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StartupStep::LoadConfig => "Carregando configuração",
            StartupStep::OpenDatabase => "Abrindo banco de dados",
            StartupStep::EnsureAdmin => "Verificando usuários",
            StartupStep::LoadCompany => "Carregando dados da empresa",
            StartupStep::CheckUpdate => "Verificando atualizações",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub config_path: Option<PathBuf>,
    /// `--db`, wins over the config file and the environment.
    pub db_path: Option<PathBuf>,
    /// Forces the update check on or off regardless of the config file.
    pub check_update: Option<bool>,
}

/// What startup produced.
#[derive(Debug)]
pub struct Startup {
    pub state: AppState,
    /// Set on first run.
    pub created_admin: Option<User>,
    pub update: Option<UpdateStatus>,
}

#[derive(Debug)]
pub enum StartupEvent {
    Step {
        index: usize,
        total: usize,
        step: StartupStep,
    },
    Done(Box<Startup>),
    Failed(AppError),
}

pub struct StartupTask {
    pub events: mpsc::Receiver<StartupEvent>,
    handle: JoinHandle<()>,
}

impl StartupTask {
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Drains events, calling `on_step` for every step, until startup ends.
    pub async fn wait(mut self, mut on_step: impl FnMut(usize, usize, StartupStep)) -> AppResult<Startup> {
        while let Some(event) = self.events.recv().await {
            match event {
                StartupEvent::Step { index, total, step } => on_step(index, total, step),
                StartupEvent::Done(startup) => return Ok(*startup),
                StartupEvent::Failed(e) => return Err(e),
            }
        }
        Err(AppError::internal("Inicialização interrompida"))
    }
}

/// Starts the worker.
pub fn run(options: StartupOptions) -> StartupTask {
    let (tx, events) = mpsc::channel(16);
    let handle = tokio::spawn(async move {
        let event = match start(options, &tx).await {
            Ok(startup) => StartupEvent::Done(Box::new(startup)),
            Err(e) => StartupEvent::Failed(e),
        };
        // Receiver gone means the front end gave up waiting
        let _ = tx.send(event).await;
    });
    StartupTask { events, handle }
}

async fn report(tx: &mpsc::Sender<StartupEvent>, step: StartupStep) {
    let index = StartupStep::ALL.iter().position(|s| *s == step).unwrap_or(0) + 1;
    debug!(step = ?step, "Startup step");
    let _ = tx
        .send(StartupEvent::Step {
            index,
            total: StartupStep::ALL.len(),
            step,
        })
        .await;
}

async fn start(options: StartupOptions, tx: &mpsc::Sender<StartupEvent>) -> AppResult<Startup> {
    report(tx, StartupStep::LoadConfig).await;
    let mut config = AppConfig::load(options.config_path)?;
    if let Some(path) = options.db_path {
        config = config.with_database_path(path);
    }

    report(tx, StartupStep::OpenDatabase).await;
    let path = config.database_path()?;
    let db = Database::new(DbConfig::new(&path).max_connections(config.database.max_connections)).await?;
    info!(path = %path.display(), "Database ready");

    report(tx, StartupStep::EnsureAdmin).await;
    let created_admin = db.users().ensure_admin(INITIAL_ADMIN_PASSWORD).await?;

    report(tx, StartupStep::LoadCompany).await;
    let company = db.company().get().await?;
    if company.is_none() {
        debug!("No company registered yet");
    }

    report(tx, StartupStep::CheckUpdate).await;
    let update = if options.check_update.unwrap_or(config.update.check_on_startup) {
        check_update(&config).await
    } else {
        debug!("Update check disabled");
        None
    };

    Ok(Startup {
        state: AppState::new(config, db, company),
        created_admin,
        update,
    })
}

async fn check_update(config: &AppConfig) -> Option<UpdateStatus> {
    let result = async {
        let update_config = config.update_config(crate::current_version()?)?;
        let client = ReleaseClient::new(update_config)?;
        Ok::<_, AppError>(client.check_for_update().await?)
    }
    .await;

    match result {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(error = %e, "Startup update check failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE;

    #[tokio::test]
    async fn test_first_run_reports_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let options = StartupOptions {
            config_path: Some(dir.path().join(CONFIG_FILE)),
            db_path: Some(dir.path().join("dados").join("pdv.db")),
            check_update: Some(false),
        };

        let mut steps = Vec::new();
        let startup = run(options)
            .wait(|index, total, step| steps.push((index, total, step)))
            .await
            .unwrap();

        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0], (1, 5, StartupStep::LoadConfig));
        assert_eq!(steps[4], (5, 5, StartupStep::CheckUpdate));

        let admin = startup.created_admin.unwrap();
        assert_eq!(admin.username, "admin");
        assert!(admin.is_admin);
        assert!(startup.update.is_none());
        assert!(startup.state.company().is_none());
        assert!(dir.path().join("dados").join("pdv.db").exists());
    }

    #[tokio::test]
    async fn test_second_run_keeps_users() {
        let dir = tempfile::tempdir().unwrap();
        let options = StartupOptions {
            config_path: Some(dir.path().join(CONFIG_FILE)),
            db_path: Some(dir.path().join("pdv.db")),
            check_update: Some(false),
        };

        let first = run(options.clone()).wait(|_, _, _| {}).await.unwrap();
        first.state.db().close().await;

        let second = run(options).wait(|_, _, _| {}).await.unwrap();
        assert!(second.created_admin.is_none());
    }

    #[tokio::test]
    async fn test_bad_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[update]\nrepo = \"sem-barra\"\n").unwrap();

        let err = run(StartupOptions {
            config_path: Some(path),
            db_path: Some(dir.path().join("pdv.db")),
            check_update: Some(false),
        })
        .wait(|_, _, _| {})
        .await
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigError);
    }
}
