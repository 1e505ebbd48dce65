//! `pdv config`: the local config file. Runs before the database is opened
//! and without login, so a broken install can still be inspected.

use std::path::PathBuf;

use crate::cli::ConfigCommand;
use crate::config::{AppConfig, ConfigError};
use crate::error::{AppError, AppResult};

pub fn run(config_path: Option<PathBuf>, db_path: Option<PathBuf>, cmd: ConfigCommand) -> AppResult<String> {
    let target = config_path.clone().or_else(AppConfig::default_config_path);
    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        config = config.with_database_path(path);
    }

    match cmd {
        ConfigCommand::Show => {
            let body = toml::to_string_pretty(&config)
                .map_err(|e| AppError::from(ConfigError::Write(e.to_string())))?;
            let origin = match &target {
                Some(path) if path.exists() => format!("# {}", path.display()),
                Some(path) => format!("# {} (ausente, valores padrão)", path.display()),
                None => "# valores padrão".to_string(),
            };
            Ok(format!(
                "{}\n# banco de dados: {}\n\n{}",
                origin,
                config.database_path()?.display(),
                body.trim_end()
            ))
        }
        ConfigCommand::Init { force } => {
            if let Some(path) = target.as_ref().filter(|p| p.exists()) {
                if !force {
                    return Err(AppError::business(format!(
                        "{} já existe. Use --force para sobrescrever.",
                        path.display()
                    )));
                }
            }
            let path = config.save(target)?;
            Ok(format!("Configuração gravada em {}.", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_init_then_show() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdv.toml");
        let db = dir.path().join("loja.db");

        let out = run(Some(path.clone()), Some(db.clone()), ConfigCommand::Init { force: false }).unwrap();
        assert!(out.contains("pdv.toml"));
        assert!(path.exists());

        let shown = run(Some(path.clone()), None, ConfigCommand::Show).unwrap();
        assert!(shown.contains("loja.db"));
        assert!(shown.contains("[update]"));

        let err = run(Some(path.clone()), None, ConfigCommand::Init { force: false }).unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert!(run(Some(path), None, ConfigCommand::Init { force: true }).is_ok());
    }

    #[test]
    fn test_show_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nenhum.toml");
        let shown = run(Some(path), Some(dir.path().join("x.db")), ConfigCommand::Show).unwrap();
        assert!(shown.contains("ausente"));
    }
}
