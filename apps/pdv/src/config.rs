//! # Application Configuration
//!
//! Settings that belong to this terminal rather than to the store database:
//! where the database lives, what the receipt header says, which printer to
//! use, where updates come from.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command line (highest priority)                                    │
//! │     --db ./pdv.db                                                      │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     PDV_DB_PATH, PDV_STORE_NAME, PDV_PRINTER, PDV_UPDATE_REPO,         │
//! │     PDV_VIACEP_URL, PDV_BRASILAPI_URL                                  │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/pdv/pdv.toml (Linux)                                     │
//! │     %APPDATA%\balcao\pdv\config\pdv.toml (Windows)                     │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "C:/PDV/dados/pdv.db"
//! max_connections = 5
//!
//! [store]
//! name = "Mercadinho Boa Vista"
//! receipt_footer = "Trocas em até 7 dias com o cupom"
//!
//! [printer]
//! default = "balcao"
//!
//! [update]
//! repo = "balcao-pdv/balcao-pdv"
//! check_on_startup = true
//!
//! [lookup]
//! timeout_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use pdv_lookup::{LookupConfig, BRASILAPI_URL, VIACEP_URL};
use pdv_update::{default_asset_name, UpdateConfig};
use pdv_core::Version;

/// Name of the config file inside the config directory.
pub const CONFIG_FILE: &str = "pdv.toml";

/// Name of the database file inside the data directory.
pub const DATABASE_FILE: &str = "pdv.db";

/// Release repository checked when none is configured.
pub const DEFAULT_UPDATE_REPO: &str = "balcao-pdv/balcao-pdv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Falha ao ler {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Arquivo de configuração inválido: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Falha ao gravar a configuração: {0}")]
    Write(String),

    #[error("Configuração inválida: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Empty means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Receipt header overrides. The company registration is used when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub name: Option<String>,

    /// CNPJ/CPF printed under the name when no company is registered.
    #[serde(default)]
    pub document: Option<String>,

    #[serde(default)]
    pub receipt_footer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrinterSettings {
    /// Printer used when a command does not name one. Falls back to the
    /// printer marked as default in the database.
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// `owner/repo` on GitHub.
    #[serde(default = "default_update_repo")]
    pub repo: String,

    #[serde(default = "default_asset")]
    pub asset_name: String,

    #[serde(default)]
    pub check_on_startup: bool,

    /// API root, for GitHub Enterprise or a mirror.
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_update_repo() -> String {
    DEFAULT_UPDATE_REPO.to_string()
}

fn default_asset() -> String {
    default_asset_name().to_string()
}

impl Default for UpdateSettings {
    fn default() -> Self {
        UpdateSettings {
            repo: default_update_repo(),
            asset_name: default_asset(),
            check_on_startup: false,
            api_base: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupSettings {
    #[serde(default = "default_viacep_url")]
    pub viacep_url: String,

    #[serde(default = "default_brasilapi_url")]
    pub brasilapi_url: String,

    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
}

fn default_viacep_url() -> String {
    VIACEP_URL.to_string()
}

fn default_brasilapi_url() -> String {
    BRASILAPI_URL.to_string()
}

fn default_lookup_timeout() -> u64 {
    10
}

impl Default for LookupSettings {
    fn default() -> Self {
        LookupSettings {
            viacep_url: default_viacep_url(),
            brasilapi_url: default_brasilapi_url(),
            timeout_secs: default_lookup_timeout(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub printer: PrinterSettings,

    #[serde(default)]
    pub update: UpdateSettings,

    #[serde(default)]
    pub lookup: LookupSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (pdv.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Write("diretório de configuração indisponível".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::Write(e.to_string()))?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::Write(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(path)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections deve ser maior que 0".into(),
            ));
        }

        UpdateConfig::parse_repo(&self.update.repo)
            .map_err(|e| ConfigError::Invalid(format!("update.repo: {}", e)))?;

        if self.update.asset_name.trim().is_empty() {
            return Err(ConfigError::Invalid("update.asset_name vazio".into()));
        }

        for (key, url) in [
            ("lookup.viacep_url", &self.lookup.viacep_url),
            ("lookup.brasilapi_url", &self.lookup.brasilapi_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "{} deve começar com http:// ou https://, recebido: {}",
                    key, url
                )));
            }
        }

        if self.lookup.timeout_secs == 0 {
            return Err(ConfigError::Invalid("lookup.timeout_secs deve ser maior que 0".into()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("PDV_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(name) = std::env::var("PDV_STORE_NAME") {
            self.store.name = Some(name);
        }

        if let Ok(printer) = std::env::var("PDV_PRINTER") {
            debug!(printer = %printer, "Overriding default printer from environment");
            self.printer.default = Some(printer);
        }

        if let Ok(repo) = std::env::var("PDV_UPDATE_REPO") {
            self.update.repo = repo;
        }

        if let Ok(url) = std::env::var("PDV_VIACEP_URL") {
            self.lookup.viacep_url = url;
        }

        if let Ok(url) = std::env::var("PDV_BRASILAPI_URL") {
            self.lookup.brasilapi_url = url;
        }
    }

    /// `<config_dir>/pdv.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("br", "balcao", "pdv")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Derived settings
    // =========================================================================

    /// Database file: configured path or `<data_dir>/pdv.db`.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("br", "balcao", "pdv")
            .ok_or_else(|| ConfigError::Invalid("diretório de dados indisponível".into()))?;
        Ok(dirs.data_dir().join(DATABASE_FILE))
    }

    pub fn lookup_config(&self) -> LookupConfig {
        LookupConfig {
            viacep_url: self.lookup.viacep_url.clone(),
            brasilapi_url: self.lookup.brasilapi_url.clone(),
            timeout: Duration::from_secs(self.lookup.timeout_secs),
        }
    }

    /// Release lookup for the running version.
    pub fn update_config(&self, current: Version) -> ConfigResult<UpdateConfig> {
        let (owner, repo) = UpdateConfig::parse_repo(&self.update.repo)
            .map_err(|e| ConfigError::Invalid(format!("update.repo: {}", e)))?;
        let mut config = UpdateConfig::new(owner, repo, current).with_asset(&self.update.asset_name);
        if let Some(base) = &self.update.api_base {
            config = config.with_api_base(base);
        }
        Ok(config)
    }

    /// Sets the database path, as `--db` does.
    pub fn with_database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.database.path = Some(path.as_ref().to_path_buf());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.update.repo, DEFAULT_UPDATE_REPO);
        assert!(!config.update.check_on_startup);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            name = "Mercadinho Boa Vista"

            [update]
            check_on_startup = true
            "#,
        )
        .unwrap();
        assert_eq!(config.store.name.as_deref(), Some("Mercadinho Boa Vista"));
        assert!(config.update.check_on_startup);
        assert_eq!(config.update.repo, DEFAULT_UPDATE_REPO);
        assert_eq!(config.lookup.viacep_url, VIACEP_URL);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.update.repo = "sem-barra".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.lookup.viacep_url = "ftp://viacep".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join(CONFIG_FILE);

        let mut config = AppConfig::default().with_database_path(dir.path().join("loja.db"));
        config.printer.default = Some("balcao".into());
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[database]"));
        assert!(text.contains("[printer]"));

        let loaded = AppConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.database.path, Some(dir.path().join("loja.db")));
        assert_eq!(loaded.printer.default.as_deref(), Some("balcao"));
    }

    #[test]
    fn test_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[database\nmax_connections = ").unwrap();

        assert!(matches!(
            AppConfig::load(Some(path.clone())),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(
            AppConfig::load_or_default(Some(path)).database.max_connections,
            5
        );
    }

    #[test]
    fn test_update_config() {
        let mut config = AppConfig::default();
        config.update.repo = "loja/pdv".into();
        config.update.api_base = Some("http://127.0.0.1:8080".into());
        let update = config.update_config(Version::new(1, 2, 0)).unwrap();
        assert_eq!(update.owner, "loja");
        assert_eq!(update.repo, "pdv");
        assert_eq!(update.api_base, "http://127.0.0.1:8080");
    }
}
