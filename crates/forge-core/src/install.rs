//! External commands spawned during the `install` phase

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Default limit for one install command
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs commands in the destination directory, streaming their output
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(INSTALL_TIMEOUT)
    }
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `program args..` in `dir` and fail unless it exits successfully
    /// within the timeout.
    pub async fn run(&self, dir: &Path, program: &str, args: &[&str]) -> Result<()> {
        let command_line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        println!();
        println!("{} {}", "Running:".dimmed(), command_line.yellow());
        println!();
        tracing::info!(command = %command_line, dir = %dir.display(), "spawning command");

        let mut child = TokioCommand::new(program)
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture stderr"))?;

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();

        let output_task = async {
            let mut stderr_open = true;
            loop {
                tokio::select! {
                    line = stdout_reader.next_line() => {
                        match line {
                            Ok(Some(line)) => println!("  {}", line),
                            Ok(None) => break,
                            Err(e) => {
                                eprintln!("{} {}", "Error reading stdout:".red(), e);
                                break;
                            }
                        }
                    }
                    line = stderr_reader.next_line(), if stderr_open => {
                        match line {
                            Ok(Some(line)) => eprintln!("  {}", line.yellow()),
                            Ok(None) => stderr_open = false,
                            Err(e) => {
                                eprintln!("{} {}", "Error reading stderr:".red(), e);
                                stderr_open = false;
                            }
                        }
                    }
                }
            }
        };

        if timeout(self.timeout, output_task).await.is_err() {
            let _ = child.kill().await;
            println!();
            anyhow::bail!(
                "`{}` timed out after {} seconds.\n\
                 Run it manually in {}",
                command_line,
                self.timeout.as_secs(),
                dir.display()
            );
        }

        match timeout(Duration::from_secs(5), child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => anyhow::bail!(
                "`{}` failed with exit code: {}",
                command_line,
                status.code().unwrap_or(-1)
            ),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                let _ = child.kill().await;
                anyhow::bail!("`{}` did not exit after its output closed", command_line)
            }
        }
    }
}
