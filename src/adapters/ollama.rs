//! Ollama adapter for claim verification.
//!
//! Runs the reasoning model as a subprocess (`ollama run <model>`), writing
//! the prompt to stdin and collecting stdout. The child is killed if it does
//! not finish within the timeout.

use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::TextCompletionService;
use crate::error::{FactCheckError, Result};

/// Default reasoning model
pub const DEFAULT_MODEL: &str = "mistral";

/// Completion service backed by a local CLI process
pub struct OllamaCompletion {
    /// Program to spawn (default: "ollama")
    program: String,

    /// Arguments passed to the program (default: ["run", <model>])
    args: Vec<String>,
}

impl Default for OllamaCompletion {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl OllamaCompletion {
    /// Run `ollama run <model>`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            program: "ollama".to_string(),
            args: vec!["run".to_string(), model.into()],
        }
    }

    /// Use an arbitrary command that reads a prompt on stdin
    pub fn with_command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The program that will be spawned
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Spawn the process, feed the prompt and wait for its output
    async fn execute_subprocess(&self, prompt: &str, step_timeout: Duration) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FactCheckError::ExternalServiceUnavailable {
                program: self.program.clone(),
                reason: if e.kind() == ErrorKind::NotFound {
                    "install it from https://ollama.com".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // stdin is written concurrently with draining stdout/stderr so a
        // chatty child cannot fill its pipe and stall
        let exchange = async {
            let (_, status, stdout, stderr) = tokio::try_join!(
                write_prompt(stdin, prompt),
                child.wait(),
                read_pipe(stdout),
                read_pipe(stderr),
            )?;
            Ok::<(ExitStatus, Vec<u8>, Vec<u8>), std::io::Error>((status, stdout, stderr))
        };

        let outcome = timeout(step_timeout, exchange).await;
        let (status, stdout, stderr) = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(FactCheckError::ExternalServiceFailed {
                    exit_code: -1,
                    stderr: format!("failed to communicate with '{}': {}", self.program, e),
                });
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(program = %self.program, error = %e, "Failed to kill timed out process");
                }
                return Err(FactCheckError::ExternalServiceTimeout {
                    timeout: step_timeout,
                });
            }
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim();
            return Err(FactCheckError::ExternalServiceFailed {
                exit_code: status.code().unwrap_or(-1),
                stderr: if stderr.is_empty() {
                    "Unknown error".to_string()
                } else {
                    stderr.to_string()
                },
            });
        }

        // Invalid bytes become U+FFFD and fail JSON parsing downstream
        let stdout = String::from_utf8_lossy(&stdout);

        debug!(program = %self.program, bytes = stdout.len(), "Completion received");
        Ok(stdout.trim().to_string())
    }
}

/// Write the prompt and close stdin. A child that exits without reading
/// its input is not an error here; its exit status tells the story.
async fn write_prompt(stdin: Option<ChildStdin>, prompt: &str) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(prompt.as_bytes()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            debug!("Reasoning process closed stdin early");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[async_trait]
impl TextCompletionService for OllamaCompletion {
    fn name(&self) -> &str {
        &self.program
    }

    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
        self.execute_subprocess(prompt, timeout).await
    }

    async fn health_check(&self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map_err(|e| FactCheckError::ExternalServiceUnavailable {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(FactCheckError::ExternalServiceFailed {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let adapter = OllamaCompletion::default();
        assert_eq!(adapter.program(), "ollama");
        assert_eq!(adapter.args, vec!["run".to_string(), "mistral".to_string()]);
        assert_eq!(adapter.name(), "ollama");
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let adapter = OllamaCompletion::with_command("definitely-not-a-real-binary-5d1c", ["run"]);
        let err = adapter
            .complete("prompt", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FactCheckError::ExternalServiceUnavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_is_returned_trimmed() {
        let adapter = OllamaCompletion::with_command("cat", Vec::<String>::new());
        let output = adapter
            .complete("  {\"verdict\": \"true\"}\n", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output, "{\"verdict\": \"true\"}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_surfaces_stderr() {
        let adapter = OllamaCompletion::with_command(
            "sh",
            ["-c", "echo 'model not found' >&2; exit 3"],
        );
        let err = adapter
            .complete("prompt", Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            FactCheckError::ExternalServiceFailed { exit_code, stderr } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr, "model not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_stderr_reports_unknown_error() {
        let adapter = OllamaCompletion::with_command("sh", ["-c", "exit 1"]);
        let err = adapter
            .complete("prompt", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Reasoning service error: Unknown error");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_utf8_output_is_returned_lossily() {
        let adapter = OllamaCompletion::with_command("sh", ["-c", "printf '\\377\\376'"]);
        let output = adapter
            .complete("prompt", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output, "\u{FFFD}\u{FFFD}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_process_times_out() {
        let adapter = OllamaCompletion::with_command("sh", ["-c", "sleep 5"]);
        let started = std::time::Instant::now();
        let err = adapter
            .complete("prompt", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, FactCheckError::ExternalServiceTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
