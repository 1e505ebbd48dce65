//! # Printer Transports
//!
//! ```text
//! ┌──────────────┬──────────────────────────┬─────────────────────────────┐
//! │ Transport    │ Target                   │ Notes                       │
//! ├──────────────┼──────────────────────────┼─────────────────────────────┤
//! │ Network      │ 192.168.0.50:9100        │ raw socket, JetDirect style │
//! │ Device       │ /dev/usb/lp0, COM3,      │ opened write-only, never    │
//! │              │ \\caixa01\termica        │ created                     │
//! │ File         │ ./cupons.prn             │ appended, created if absent │
//! └──────────────┴──────────────────────────┴─────────────────────────────┘
//! ```
//!
//! Each `send` opens the target, writes the whole document and closes it.
//! Thermal printers accept one connection at a time, so nothing is kept open
//! between receipts.

use std::time::Duration;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{PrintError, PrintResult};
use pdv_core::PrinterTransportKind;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterTransport {
    Network {
        host: String,
        port: u16,
        connect_timeout: Duration,
        write_timeout: Duration,
    },
    Device {
        path: String,
        open_timeout: Duration,
        write_timeout: Duration,
    },
    File {
        path: String,
    },
}

impl PrinterTransport {
    pub fn from_kind(kind: &PrinterTransportKind) -> Self {
        match kind {
            PrinterTransportKind::Network { host, port } => PrinterTransport::Network {
                host: host.clone(),
                port: *port,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                write_timeout: DEFAULT_WRITE_TIMEOUT,
            },
            PrinterTransportKind::Device { path } => PrinterTransport::Device {
                path: path.clone(),
                open_timeout: DEFAULT_CONNECT_TIMEOUT,
                write_timeout: DEFAULT_WRITE_TIMEOUT,
            },
            PrinterTransportKind::File { path } => PrinterTransport::File { path: path.clone() },
        }
    }

    /// Overrides the connect (or device open) and write timeouts. File
    /// targets always use [`DEFAULT_WRITE_TIMEOUT`].
    pub fn with_timeouts(mut self, connect: Duration, write: Duration) -> Self {
        match &mut self {
            PrinterTransport::Network {
                connect_timeout,
                write_timeout,
                ..
            }
            | PrinterTransport::Device {
                open_timeout: connect_timeout,
                write_timeout,
                ..
            } => {
                *connect_timeout = connect;
                *write_timeout = write;
            }
            PrinterTransport::File { .. } => {}
        }
        self
    }

    /// Human-readable target, used in errors and logs.
    pub fn target(&self) -> String {
        match self {
            PrinterTransport::Network { host, port, .. } => format!("{}:{}", host, port),
            PrinterTransport::Device { path, .. } | PrinterTransport::File { path } => path.clone(),
        }
    }

    /// Delivers a complete document.
    pub async fn send(&self, bytes: &[u8]) -> PrintResult<()> {
        if bytes.is_empty() {
            return Err(PrintError::EmptyDocument);
        }
        let target = self.target();

        match self {
            PrinterTransport::Network {
                host,
                port,
                connect_timeout,
                write_timeout,
            } => {
                let mut stream = match timeout(*connect_timeout, TcpStream::connect((host.as_str(), *port))).await {
                    Ok(Ok(s)) => s,
                    Ok(Err(source)) => return Err(PrintError::Connect { target, source }),
                    Err(_) => {
                        return Err(PrintError::Timeout {
                            target,
                            operation: "conectar".to_string(),
                        })
                    }
                };
                let _ = stream.set_nodelay(true);

                let write = async {
                    stream.write_all(bytes).await?;
                    stream.flush().await?;
                    stream.shutdown().await
                };
                match timeout(*write_timeout, write).await {
                    Ok(Ok(())) => {}
                    Ok(Err(source)) => return Err(PrintError::Io { target, source }),
                    Err(_) => {
                        return Err(PrintError::Timeout {
                            target,
                            operation: "enviar dados".to_string(),
                        })
                    }
                }
            }
            PrinterTransport::Device {
                path,
                open_timeout,
                write_timeout,
            } => {
                // Opening a spooler share or a parallel port can block as well
                let mut options = OpenOptions::new();
                options.write(true);
                let mut file = match timeout(*open_timeout, options.open(path)).await {
                    Ok(Ok(f)) => f,
                    Ok(Err(source)) => return Err(PrintError::Connect { target, source }),
                    Err(_) => {
                        return Err(PrintError::Timeout {
                            target,
                            operation: "abrir o dispositivo".to_string(),
                        })
                    }
                };
                write_file(&mut file, bytes, &target, *write_timeout).await?;
            }
            PrinterTransport::File { path } => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .map_err(|source| PrintError::Connect {
                        target: target.clone(),
                        source,
                    })?;
                write_file(&mut file, bytes, &target, DEFAULT_WRITE_TIMEOUT).await?;
            }
        }

        debug!(target = %target, bytes = bytes.len(), "Document sent to printer");
        Ok(())
    }
}

async fn write_file(
    file: &mut tokio::fs::File,
    bytes: &[u8],
    target: &str,
    write_timeout: Duration,
) -> PrintResult<()> {
    // A USB/LPT device with no paper blocks the write instead of failing
    let write = async {
        file.write_all(bytes).await?;
        file.flush().await
    };
    match timeout(write_timeout, write).await {
        Ok(result) => result.map_err(|source| PrintError::Io {
            target: target.to_string(),
            source,
        }),
        Err(_) => Err(PrintError::Timeout {
            target: target.to_string(),
            operation: "enviar dados".to_string(),
        }),
    }
}
