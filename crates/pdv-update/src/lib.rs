//! # pdv-update: Self-Update from GitHub Releases
//!
//! ## Modules
//!
//! - [`config`] - Repository, asset and API settings
//! - [`release`] - Latest release lookup and version comparison
//! - [`download`] - Background download with progress events
//! - [`swap`] - Script that replaces the executable after exit
//! - [`error`] - Update error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdv_core::Version;
//! use pdv_update::{ReleaseClient, UpdateConfig, UpdateStatus};
//!
//! # async fn run() -> pdv_update::UpdateResult<()> {
//! let config = UpdateConfig::new("balcao-pdv", "balcao-pdv", Version::new(1, 0, 0));
//! let client = ReleaseClient::new(config)?;
//! if let UpdateStatus::Available { version, .. } = client.check_for_update().await? {
//!     println!("Nova versão {}", version);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod release;
pub mod swap;

pub use config::{default_asset_name, UpdateConfig, GITHUB_API};
pub use download::{staged_path, DownloadEvent, DownloadTask, Downloader};
pub use error::{UpdateError, UpdateResult};
pub use release::{evaluate, Asset, Release, ReleaseClient, UpdateStatus};
pub use swap::{apply_update, ScriptKind, SwapScript};

/// Minimal HTTP/1.1 server on loopback for client tests.
#[cfg(test)]
pub(crate) mod test_server {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub struct Route {
        pub path: &'static str,
        pub status: u16,
        pub body: Vec<u8>,
        /// Statuses answered, in order, before `status` is served.
        pub failures: Vec<u16>,
    }

    impl Route {
        pub fn ok(path: &'static str, body: Vec<u8>) -> Self {
            Route {
                path,
                status: 200,
                body,
                failures: Vec::new(),
            }
        }

        pub fn failing_first(mut self, statuses: &[u16]) -> Self {
            self.failures = statuses.to_vec();
            self
        }
    }

    /// Serves `routes` until the test ends; unknown paths get 404.
    /// Returns the base URL.
    pub async fn serve(routes: Vec<Route>) -> String {
        serve_counted(routes).await.0
    }

    /// Like [`serve`], also returning the number of requests received.
    pub async fn serve_counted(mut routes: Vec<Route>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

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
                counter.fetch_add(1, Ordering::SeqCst);
                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();

                let (status, body) = match routes.iter_mut().find(|r| r.path == path) {
                    Some(route) if !route.failures.is_empty() => {
                        (route.failures.remove(0), b"{\"message\":\"Unavailable\"}".to_vec())
                    }
                    Some(route) => (route.status, route.body.clone()),
                    None => (404, b"{\"message\":\"Not Found\"}".to_vec()),
                };

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

        (format!("http://{}", addr), hits)
    }
}
