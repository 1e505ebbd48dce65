//! # Print Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Connect  ── TCP connect refused / device path missing                  │
//! │  Timeout  ── printer did not accept the connection or the bytes in time │
//! │  Io       ── write failed half-way (paper jam, cable pulled)            │
//! │  NoPrinter── nothing configured to print on                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io;
use thiserror::Error;

/// Result type alias for printing.
pub type PrintResult<T> = Result<T, PrintError>;

#[derive(Debug, Error)]
pub enum PrintError {
    /// Could not reach the printer.
    #[error("Não foi possível conectar à impressora {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    /// The printer did not respond in time.
    #[error("Tempo esgotado ao {operation} na impressora {target}")]
    Timeout { target: String, operation: String },

    /// Writing to the printer failed.
    #[error("Falha ao enviar dados para a impressora {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: io::Error,
    },

    /// No printer is configured.
    #[error("Nenhuma impressora configurada")]
    NoPrinter,

    /// Nothing to send.
    #[error("Documento vazio")]
    EmptyDocument,
}

impl PrintError {
    /// True when retrying later may succeed (printer off, busy or unplugged).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PrintError::Connect { .. } | PrintError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient() {
        let err = PrintError::Timeout {
            target: "tcp://10.0.0.9:9100".to_string(),
            operation: "conectar".to_string(),
        };
        assert!(err.is_transient());
        assert!(err.to_string().contains("10.0.0.9"));
        assert!(!PrintError::NoPrinter.is_transient());
    }
}
