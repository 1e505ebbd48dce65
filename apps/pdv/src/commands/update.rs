//! # Self-update
//!
//! ```text
//! check ──► GET /repos/{owner}/{repo}/releases/latest ──► UpdateStatus
//!
//! install ──► check ──► download to <exe>.new ──► swap script ──► exit
//!                              │                       │
//!                     progress on stderr      waits for this pid, moves
//!                                             <exe>.new over <exe>, relaunches
//! ```

use std::io::Write;

use tracing::info;

use crate::cli::UpdateCommand;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use pdv_update::{apply_update, staged_path, DownloadEvent, ReleaseClient, SwapScript, UpdateStatus};

pub async fn run(state: &AppState, cmd: UpdateCommand) -> AppResult<String> {
    let client = ReleaseClient::new(state.config().update_config(crate::current_version()?)?)?;
    let status = client.check_for_update().await?;

    match cmd {
        UpdateCommand::Check => Ok(describe(&status)),
        UpdateCommand::Install { no_relaunch } => {
            let UpdateStatus::Available { version, asset, .. } = status else {
                return Ok(describe(&status));
            };

            let exe = std::env::current_exe()
                .map_err(|e| AppError::internal(format!("Executável atual não encontrado: {}", e)))?;
            let staged = client
                .downloader(staged_path(&exe))
                .spawn(asset)
                .wait(|event| {
                    if let Some(line) = progress_line(event) {
                        let mut err = std::io::stderr();
                        let _ = write!(err, "\r{}", line);
                        let _ = err.flush();
                    }
                })
                .await;
            eprintln!();
            let staged = staged?;

            let script = SwapScript::new(&exe, &staged, std::process::id()).with_relaunch(!no_relaunch);
            let path = apply_update(&script).await?;
            info!(version = %version, script = %path.display(), "Update staged");
            Ok(format!(
                "Versão {} baixada. O PDV será substituído ao sair{}.",
                version,
                if no_relaunch { "" } else { " e reaberto" }
            ))
        }
    }
}

fn describe(status: &UpdateStatus) -> String {
    match status {
        UpdateStatus::UpToDate { current, latest } => {
            format!("Versão {} está atualizada (última publicada: {}).", current, latest)
        }
        UpdateStatus::Available {
            current,
            version,
            name,
            notes,
            ..
        } => {
            let mut out = format!("Nova versão disponível: {} (instalada: {}).", version, current);
            if let Some(name) = name.as_deref().filter(|n| !n.trim().is_empty()) {
                out.push_str(&format!("\n{}", name));
            }
            if let Some(notes) = notes.as_deref().filter(|n| !n.trim().is_empty()) {
                out.push_str(&format!("\n\n{}", notes.trim()));
            }
            out.push_str("\n\nInstale com `pdv update install`.");
            out
        }
    }
}

/// One-line progress text; `None` for events with nothing to show.
fn progress_line(event: &DownloadEvent) -> Option<String> {
    match event {
        DownloadEvent::Progress {
            received,
            total: Some(total),
        } if *total > 0 => Some(format!(
            "Baixando... {:>3}% ({} de {} KB)",
            received * 100 / total,
            received / 1024,
            total / 1024
        )),
        DownloadEvent::Progress { received, .. } => Some(format!("Baixando... {} KB", received / 1024)),
        DownloadEvent::Finished { .. } => Some("Download concluído.".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::ErrorCode;
    use crate::testing;

    const LATEST: &str = "/repos/balcao-pdv/balcao-pdv/releases/latest";

    async fn state_for(tag: Option<&str>) -> AppState {
        let body = tag.map(|t| {
            format!(
                r#"{{"tag_name": "{}", "name": "Balcão PDV {}", "body": "- Cupom em 58mm",
                    "assets": [{{"name": "pdv-test", "size": 4,
                    "browser_download_url": "http://127.0.0.1:9/pdv-test"}}]}}"#,
                t, t
            )
        });
        let routes = match &body {
            Some(b) => vec![(LATEST, 200, b.as_str())],
            None => Vec::new(),
        };
        let base = testing::serve(routes).await;

        let mut config = AppConfig::default();
        config.update.api_base = Some(base);
        config.update.asset_name = "pdv-test".into();
        testing::state_with(config).await
    }

    #[tokio::test]
    async fn test_check_up_to_date() {
        let state = state_for(Some("v0.0.1")).await;
        let out = run(&state, UpdateCommand::Check).await.unwrap();
        assert!(out.contains("está atualizada"));
        assert!(out.contains("0.0.1"));
    }

    #[tokio::test]
    async fn test_check_available() {
        let state = state_for(Some("v99.0.0")).await;
        let out = run(&state, UpdateCommand::Check).await.unwrap();
        assert!(out.starts_with("Nova versão disponível: 99.0.0"));
        assert!(out.contains("Cupom em 58mm"));
    }

    #[tokio::test]
    async fn test_install_when_up_to_date_does_nothing() {
        let state = state_for(Some("v0.0.1")).await;
        let out = run(&state, UpdateCommand::Install { no_relaunch: true })
            .await
            .unwrap();
        assert!(out.contains("está atualizada"));
    }

    #[tokio::test]
    async fn test_no_release_published() {
        let state = state_for(None).await;
        let err = run(&state, UpdateCommand::Check).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[test]
    fn test_progress_line() {
        let line = progress_line(&DownloadEvent::Progress {
            received: 512 * 1024,
            total: Some(2048 * 1024),
        });
        assert_eq!(line.as_deref(), Some("Baixando...  25% (512 de 2048 KB)"));
        assert!(progress_line(&DownloadEvent::Started { total: None }).is_none());
    }
}
