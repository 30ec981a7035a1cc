// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automatic pager for terminal output

use anyhow::{Context, Result};
use std::env;
use std::io::{self, IsTerminal, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::debug;

const DEFAULT_PAGER: &str = "pager";

/// Pager command to run, or `None` when paging is disabled
///
/// `$PAGER` wins over the configured command, which wins over `pager`.
pub fn pager_command(env_pager: Option<String>, configured: Option<&str>) -> Option<String> {
    let command = env_pager.unwrap_or_else(|| configured.unwrap_or(DEFAULT_PAGER).to_string());
    if command.is_empty() || command == "cat" {
        None
    } else {
        Some(command)
    }
}

/// A running pager reading from our output
pub struct Pager {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl Pager {
    /// Start a pager if stdout is a terminal and paging is not disabled
    pub fn spawn(configured: Option<&str>) -> Result<Option<Self>> {
        if !io::stdout().is_terminal() {
            return Ok(None);
        }
        match pager_command(env::var("PAGER").ok(), configured) {
            Some(command) => Self::spawn_command(&command).map(Some),
            None => Ok(None),
        }
    }

    pub fn spawn_command(command: &str) -> Result<Self> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).stdin(Stdio::piped());
        if env::var_os("LESS").is_none() {
            cmd.env("LESS", "-FXR");
        }
        if env::var_os("LV").is_none() {
            cmd.env("LV", "-c");
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to start pager {command:?}"))?;
        debug!(command, pid = child.id(), "pager started");
        let stdin = child.stdin.take();
        Ok(Self { child, stdin })
    }

    /// Close the pipe and wait for the user to leave the pager
    pub fn finish(mut self) -> Result<()> {
        drop(self.stdin.take());
        let status = self.child.wait().context("failed to wait for pager")?;
        if !status.success() {
            anyhow::bail!("pager exited with {status}");
        }
        Ok(())
    }

    fn pipe(&mut self) -> io::Result<&mut ChildStdin> {
        self.stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "pager input closed"))
    }
}

impl Write for Pager {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pipe()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.pipe()?.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_wins_then_config_then_default() {
        assert_eq!(
            pager_command(Some("less".to_string()), Some("most")),
            Some("less".to_string())
        );
        assert_eq!(pager_command(None, Some("most")), Some("most".to_string()));
        assert_eq!(pager_command(None, None), Some("pager".to_string()));
    }

    #[test]
    fn empty_or_cat_disables_paging() {
        assert_eq!(pager_command(Some(String::new()), Some("most")), None);
        assert_eq!(pager_command(Some("cat".to_string()), None), None);
        assert_eq!(pager_command(None, Some("cat")), None);
    }

    #[cfg(unix)]
    #[test]
    fn output_reaches_the_pager() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let target = dir.path().join("paged.txt");
        let mut pager =
            Pager::spawn_command(&format!("cat > '{}'", target.display())).expect("spawn");
        writeln!(pager, "Results: 3").expect("write");
        pager.finish().expect("finish");
        assert_eq!(std::fs::read_to_string(&target).expect("read"), "Results: 3\n");
    }

    #[cfg(unix)]
    #[test]
    fn failing_pager_is_reported() {
        let pager = Pager::spawn_command("exit 3").expect("spawn");
        let err = pager.finish().unwrap_err();
        assert!(err.to_string().contains("pager exited"));
    }
}
