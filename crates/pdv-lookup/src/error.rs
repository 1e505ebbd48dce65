use thiserror::Error;

use pdv_core::ValidationError;

pub type LookupResult<T> = Result<T, LookupError>;

#[derive(Debug, Error)]
pub enum LookupError {
    /// Rejected before any request was made.
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    #[error("{what} não encontrado")]
    NotFound { what: String },

    #[error("Falha de rede: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serviço respondeu {status} para {url}")]
    Status { status: u16, url: String },

    #[error("Resposta inesperada do serviço: {0}")]
    Decode(String),

    #[error("Endereço de serviço inválido: {0}")]
    BadUrl(String),
}

impl LookupError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        LookupError::NotFound { what: what.into() }
    }
}
