//! # Executable Swap
//!
//! A running executable cannot overwrite itself on Windows, so the swap is
//! delegated to a small script written next to it:
//!
//! ```text
//!   1. wait until the process `pid` has exited
//!   2. move <exe>.new over <exe>
//!   3. start <exe> again (optional)
//!   4. delete the script
//! ```
//!
//! Windows gets a batch file, everything else a POSIX shell script.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::error::{UpdateError, UpdateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Batch,
    Shell,
}

impl ScriptKind {
    pub const fn for_current_platform() -> Self {
        if cfg!(windows) {
            ScriptKind::Batch
        } else {
            ScriptKind::Shell
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            ScriptKind::Batch => "pdv-update.bat",
            ScriptKind::Shell => "pdv-update.sh",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapScript {
    pub kind: ScriptKind,
    pub exe: PathBuf,
    pub staged: PathBuf,
    pub pid: u32,
    pub relaunch: bool,
}

impl SwapScript {
    pub fn new(exe: impl Into<PathBuf>, staged: impl Into<PathBuf>, pid: u32) -> Self {
        SwapScript {
            kind: ScriptKind::for_current_platform(),
            exe: exe.into(),
            staged: staged.into(),
            pid,
            relaunch: true,
        }
    }

    pub fn with_kind(mut self, kind: ScriptKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_relaunch(mut self, relaunch: bool) -> Self {
        self.relaunch = relaunch;
        self
    }

    /// Script path: same directory as the executable.
    pub fn path(&self) -> PathBuf {
        self.exe
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(self.kind.file_name())
    }

    pub fn render(&self) -> String {
        match self.kind {
            ScriptKind::Batch => self.render_batch(),
            ScriptKind::Shell => self.render_shell(),
        }
    }

    fn render_batch(&self) -> String {
        let exe = self.exe.display();
        let staged = self.staged.display();
        let pid = self.pid;
        let mut s = String::new();
        s.push_str("@echo off\r\n");
        s.push_str(":wait\r\n");
        s.push_str(&format!(
            "tasklist /FI \"PID eq {pid}\" 2>NUL | find \"{pid}\" >NUL\r\n"
        ));
        s.push_str("if not errorlevel 1 (\r\n");
        s.push_str("  timeout /t 1 /nobreak >NUL\r\n");
        s.push_str("  goto wait\r\n");
        s.push_str(")\r\n");
        s.push_str(&format!("move /Y \"{staged}\" \"{exe}\" >NUL\r\n"));
        if self.relaunch {
            s.push_str(&format!("start \"\" \"{exe}\"\r\n"));
        }
        s.push_str("del \"%~f0\"\r\n");
        s
    }

    fn render_shell(&self) -> String {
        let exe = shell_quote(&self.exe);
        let staged = shell_quote(&self.staged);
        let pid = self.pid;
        let mut s = String::new();
        s.push_str("#!/bin/sh\n");
        s.push_str(&format!(
            "while kill -0 {pid} 2>/dev/null; do sleep 1; done\n"
        ));
        s.push_str(&format!("mv -f {staged} {exe}\n"));
        s.push_str(&format!("chmod +x {exe}\n"));
        if self.relaunch {
            s.push_str(&format!("{exe} >/dev/null 2>&1 &\n"));
        }
        s.push_str("rm -f \"$0\"\n");
        s
    }

    /// Writes the script and returns its path.
    pub async fn write(&self) -> UpdateResult<PathBuf> {
        let path = self.path();
        tokio::fs::write(&path, self.render())
            .await
            .map_err(|e| UpdateError::io(&path, e))?;
        Ok(path)
    }
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "'\\''"))
}

/// Writes the swap script for the running process and launches it detached.
/// The caller exits afterwards so the script can replace the executable.
pub async fn apply_update(script: &SwapScript) -> UpdateResult<PathBuf> {
    if !script.staged.exists() {
        return Err(UpdateError::io(
            &script.staged,
            std::io::Error::new(std::io::ErrorKind::NotFound, "arquivo baixado não encontrado"),
        ));
    }

    let path = script.write().await?;
    let mut command = match script.kind {
        ScriptKind::Batch => {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&path);
            c
        }
        ScriptKind::Shell => {
            let mut c = Command::new("sh");
            c.arg(&path);
            c
        }
    };
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| UpdateError::io(&path, e))?;

    info!(script = %path.display(), exe = %script.exe.display(), "Update swap scheduled");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_script() {
        let script = SwapScript::new("C:\\PDV\\pdv.exe", "C:\\PDV\\pdv.exe.new", 4242)
            .with_kind(ScriptKind::Batch);
        let text = script.render();

        assert!(text.contains("PID eq 4242"));
        assert!(text.contains("move /Y \"C:\\PDV\\pdv.exe.new\" \"C:\\PDV\\pdv.exe\""));
        assert!(text.contains("start \"\" \"C:\\PDV\\pdv.exe\""));
        assert!(text.ends_with("del \"%~f0\"\r\n"));
    }

    #[test]
    fn test_shell_script_quotes_and_relaunch() {
        let script = SwapScript::new("/opt/it's/pdv", "/opt/it's/pdv.new", 7)
            .with_kind(ScriptKind::Shell)
            .with_relaunch(false);
        let text = script.render();

        assert!(text.starts_with("#!/bin/sh\n"));
        assert!(text.contains("kill -0 7"));
        assert!(text.contains("mv -f '/opt/it'\\''s/pdv.new' '/opt/it'\\''s/pdv'"));
        assert!(!text.contains(">/dev/null 2>&1 &"));
    }

    #[tokio::test]
    async fn test_write_next_to_exe() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("pdv");
        let script = SwapScript::new(&exe, dir.path().join("pdv.new"), 1).with_kind(ScriptKind::Shell);

        let path = script.write().await.unwrap();
        assert_eq!(path, dir.path().join("pdv-update.sh"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("rm -f \"$0\""));
    }

    #[tokio::test]
    async fn test_apply_requires_download() {
        let dir = tempfile::tempdir().unwrap();
        let script = SwapScript::new(dir.path().join("pdv"), dir.path().join("pdv.new"), 1);
        assert!(matches!(apply_update(&script).await, Err(UpdateError::Io { .. })));
    }
}
