//! # Background Asset Download
//!
//! ```text
//!   caller                         download task
//!   ──────                         ─────────────
//!   spawn(asset) ───────────────►  GET browser_download_url
//!        │                              │
//!        │   ◄── Started{total} ────────┤
//!        │   ◄── Progress{..} ──────────┤  stream chunks into <dest>.part
//!        │   ◄── Progress{..} ──────────┤
//!        │                              │  size check, rename to <dest>
//!        │   ◄── Finished{path} ────────┘
//!        │         or Failed{message}
//! ```
//!
//! Dropping the event receiver cancels the download at the next chunk and
//! removes the partial file.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{UpdateError, UpdateResult};
use crate::release::Asset;

/// Bytes between progress events when the total size is unknown.
const PROGRESS_STEP_UNKNOWN: u64 = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Started { total: Option<u64> },
    Progress { received: u64, total: Option<u64> },
    Finished { path: PathBuf },
    Failed { message: String },
}

/// Where the new executable is staged: `<exe>.new` beside the running one.
pub fn staged_path(exe: &Path) -> PathBuf {
    let mut name = exe
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".new");
    exe.with_file_name(name)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// A running download.
#[derive(Debug)]
pub struct DownloadTask {
    pub events: mpsc::Receiver<DownloadEvent>,
    handle: JoinHandle<()>,
}

impl DownloadTask {
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Drains events until the download ends, feeding each to `on_event`.
    /// Returns the downloaded path.
    pub async fn wait(mut self, mut on_event: impl FnMut(&DownloadEvent)) -> UpdateResult<PathBuf> {
        while let Some(event) = self.events.recv().await {
            on_event(&event);
            match event {
                DownloadEvent::Finished { path } => return Ok(path),
                DownloadEvent::Failed { message } => {
                    return Err(UpdateError::DownloadFailed(message));
                }
                _ => {}
            }
        }
        Err(UpdateError::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
    dest: PathBuf,
}

impl Downloader {
    pub fn new(http: Client, dest: impl Into<PathBuf>) -> Self {
        Downloader {
            http,
            dest: dest.into(),
        }
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Starts the download on a tokio task.
    pub fn spawn(self, asset: Asset) -> DownloadTask {
        let (tx, events) = mpsc::channel(32);
        let handle = tokio::spawn(async move {
            match self.run(&asset, &tx).await {
                Ok(path) => {
                    info!(asset = %asset.name, path = %path.display(), "Update downloaded");
                    let _ = tx.send(DownloadEvent::Finished { path }).await;
                }
                Err(e) => {
                    error!(asset = %asset.name, error = %e, "Update download failed");
                    let _ = tx
                        .send(DownloadEvent::Failed {
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        });
        DownloadTask { events, handle }
    }

    async fn run(&self, asset: &Asset, tx: &mpsc::Sender<DownloadEvent>) -> UpdateResult<PathBuf> {
        let part = part_path(&self.dest);
        if let Err(e) = self.fetch_into(asset, &part, tx).await {
            let _ = fs::remove_file(&part).await;
            return Err(e);
        }

        fs::rename(&part, &self.dest)
            .await
            .map_err(|e| UpdateError::io(&self.dest, e))?;
        make_executable(&self.dest).await?;
        Ok(self.dest.clone())
    }

    async fn fetch_into(
        &self,
        asset: &Asset,
        part: &Path,
        tx: &mpsc::Sender<DownloadEvent>,
    ) -> UpdateResult<()> {
        let response = self.http.get(&asset.browser_download_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::Status {
                status: status.as_u16(),
                url: asset.browser_download_url.clone(),
            });
        }

        let expected = Some(asset.size)
            .filter(|s| *s > 0)
            .or(response.content_length());
        tx.send(DownloadEvent::Started { total: expected })
            .await
            .map_err(|_| UpdateError::Cancelled)?;

        let mut file = File::create(part)
            .await
            .map_err(|e| UpdateError::io(part, e))?;
        let mut received: u64 = 0;
        let mut reported: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdateError::io(part, e))?;
            received += chunk.len() as u64;

            let due = match expected {
                Some(total) if total > 0 => received * 100 / total != reported * 100 / total,
                _ => received - reported >= PROGRESS_STEP_UNKNOWN,
            };
            if due {
                reported = received;
                tx.send(DownloadEvent::Progress {
                    received,
                    total: expected,
                })
                .await
                .map_err(|_| UpdateError::Cancelled)?;
            }
        }
        file.flush().await.map_err(|e| UpdateError::io(part, e))?;

        if let Some(expected) = expected {
            if expected != received {
                return Err(UpdateError::SizeMismatch { expected, received });
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> UpdateResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| UpdateError::io(path, e))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> UpdateResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{self, Route};

    #[test]
    fn test_staged_path() {
        assert_eq!(
            staged_path(Path::new("/opt/pdv/pdv")),
            PathBuf::from("/opt/pdv/pdv.new")
        );
        assert_eq!(
            staged_path(Path::new("C:/PDV/pdv.exe")),
            PathBuf::from("C:/PDV/pdv.exe.new")
        );
    }

    fn asset(base: &str, size: u64) -> Asset {
        Asset {
            name: "pdv".to_string(),
            size,
            browser_download_url: format!("{}/download/pdv", base),
        }
    }

    #[tokio::test]
    async fn test_download_reports_progress() {
        let body = vec![7u8; 300_000];
        let base = test_server::serve(vec![Route::ok("/download/pdv", body.clone())]).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("pdv.new");

        let task = Downloader::new(Client::new(), &dest).spawn(asset(&base, body.len() as u64));
        let mut events = Vec::new();
        let path = task.wait(|e| events.push(e.clone())).await.unwrap();

        assert_eq!(path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert_eq!(events[0], DownloadEvent::Started { total: Some(300_000) });
        assert!(events.iter().any(|e| matches!(e, DownloadEvent::Progress { .. })));
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_size_mismatch_fails_and_cleans_up() {
        let base = test_server::serve(vec![Route::ok("/download/pdv", vec![1u8; 10])]).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("pdv.new");

        let task = Downloader::new(Client::new(), &dest).spawn(asset(&base, 99));
        let mut failed = None;
        let result = task
            .wait(|e| {
                if let DownloadEvent::Failed { message } = e {
                    failed = Some(message.clone());
                }
            })
            .await;

        assert!(result.is_err());
        assert!(failed.unwrap().contains("99"));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
