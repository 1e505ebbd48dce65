//! # Update Error Types

use std::path::PathBuf;
use thiserror::Error;

use pdv_core::ValidationError;

/// Result type alias for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

#[derive(Debug, Error)]
pub enum UpdateError {
    // =========================================================================
    // Release Lookup
    // =========================================================================
    /// Request failed before a response arrived.
    #[error("Falha de rede: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("Servidor respondeu {status} para {url}")]
    Status { status: u16, url: String },

    /// GitHub API rate limit reached.
    #[error("Limite de consultas ao GitHub atingido; tente mais tarde")]
    RateLimited,

    /// The repository has no published release.
    #[error("Nenhuma versão publicada")]
    NoRelease,

    /// The release exists but does not carry the expected file.
    #[error("A versão {tag} não contém o arquivo {asset}")]
    AssetMissing { tag: String, asset: String },

    #[error("Versão inválida: {0}")]
    InvalidVersion(#[from] ValidationError),

    #[error("Configuração de atualização inválida: {0}")]
    Config(String),

    // =========================================================================
    // Download & Install
    // =========================================================================
    #[error("Download incompleto: esperado {expected} bytes, recebido {received}")]
    SizeMismatch { expected: u64, received: u64 },

    /// Reported by the download task.
    #[error("Falha no download: {0}")]
    DownloadFailed(String),

    #[error("Download cancelado")]
    Cancelled,

    #[error("Erro de arquivo em {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UpdateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UpdateError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UpdateError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            UpdateError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
