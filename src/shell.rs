use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Extension trait for driving short-lived external tools with checked output.
#[async_trait]
pub trait CheckCommandOutput {
    /// Run the command, failing unless it exits 0. Returns captured stdout.
    async fn run_check_output(&mut self) -> Result<Vec<u8>>;

    /// Run the command and map its exit code, stdout and stderr through `f`.
    async fn run_with_status_checker<R>(
        &mut self,
        f: impl Fn(i32, Vec<u8>, Vec<u8>) -> Result<R> + Send + Sync,
    ) -> Result<R>;
}

#[async_trait]
impl CheckCommandOutput for Command {
    async fn run_check_output(&mut self) -> Result<Vec<u8>> {
        self.run_with_status_checker(|code, stdout, _| {
            if code != 0 {
                bail!("Bad exit code")
            }
            Ok(stdout)
        })
        .await
    }

    async fn run_with_status_checker<R>(
        &mut self,
        f: impl Fn(i32, Vec<u8>, Vec<u8>) -> Result<R> + Send + Sync,
    ) -> Result<R> {
        // reset all locale settings for this command
        self.env("LC_ALL", "C");

        tracing::trace!(cmd = ?self.as_std(), "run external cmd");

        let output = self
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("cmd: {:?}", self.as_std()))
            .context("Failed to execute external command")?;

        let stdout = output.stdout;
        let stderr = output.stderr;
        let code = output.status.code();

        match code {
            Some(code) => f(code, stdout.clone(), stderr.clone()),
            None => Err(anyhow!("killed by signal")),
        }
        .with_context(|| {
            format!(
                "\ncmd: {:?}\nexit code: {}\nstdout: {}\nstderr: {}",
                self.as_std(),
                code.map(|code| code.to_string())
                    .unwrap_or("unknown".to_string()),
                String::from_utf8_lossy(&stdout),
                String::from_utf8_lossy(&stderr),
            )
        })
    }
}
