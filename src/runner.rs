//! Process runner for the tesseract binary
//!
//! Spawns the engine directly (no shell), pipes optional image bytes into its
//! standard input and maps the exit status onto an [`Invocation`].

use crate::config::RunnerConfig;
use crate::error::OcrError;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};

/// Outcome of one engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Exit code zero; decoded standard output
    Succeeded(String),
    /// Non-zero exit (or killed by a signal); decoded standard error
    Failed { code: Option<i32>, stderr: String },
}

impl Invocation {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Text of whichever stream the outcome carries
    pub fn text(&self) -> &str {
        match self {
            Self::Succeeded(stdout) => stdout,
            Self::Failed { stderr, .. } => stderr,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Succeeded(stdout) => stdout,
            Self::Failed { stderr, .. } => stderr,
        }
    }

    /// Convert into the stdout text, turning a failure into an error
    pub fn into_result(self) -> Result<String, OcrError> {
        match self {
            Self::Succeeded(stdout) => Ok(stdout),
            Self::Failed { code, stderr } => Err(OcrError::EngineFailed { code, stderr }),
        }
    }
}

/// Something that can execute the engine with an argument vector
pub trait Runner: Send + Sync {
    /// Run the engine with `arguments` appended after the binary name,
    /// writing `input` to its standard input when given.
    fn run(&self, arguments: &[String], input: Option<&[u8]>) -> Result<Invocation, OcrError>;
}

/// Runs the real tesseract binary as a subprocess
///
/// The blocking [`Runner::run`] drives a tokio child on a private
/// current-thread runtime, so it can be called from plain threads and from
/// `spawn_blocking` alike.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    config: RunnerConfig,
}

/// Raw result of a finished child
struct Captured {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    fn command(&self, arguments: &[String], has_input: bool) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .args(arguments)
            .envs(&self.config.env)
            .stdin(if has_input {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.current_dir {
            command.current_dir(dir);
        }

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            if self.config.hide_window {
                command.creation_flags(CREATE_NO_WINDOW);
            }
        }

        command
    }

    async fn execute(
        &self,
        arguments: &[String],
        input: Option<&[u8]>,
    ) -> Result<Captured, OcrError> {
        let mut child = self
            .command(arguments, input.is_some())
            .spawn()
            .map_err(|source| OcrError::Spawn {
                binary: self.config.binary.display().to_string(),
                source,
            })?;

        let Some(timeout) = self.config.timeout else {
            return communicate(&mut child, input).await;
        };

        let outcome = tokio::time::timeout(timeout, communicate(&mut child, input)).await;
        match outcome {
            Ok(captured) => captured,
            Err(_) => {
                tracing::warn!("tesseract exceeded {:?}, killing process", timeout);
                // The pipes went down with the cancelled future; kill also reaps
                if let Err(e) = child.kill().await {
                    tracing::debug!("Failed to kill tesseract: {}", e);
                }
                Err(OcrError::Timeout(timeout))
            }
        }
    }
}

impl Runner for ProcessRunner {
    fn run(&self, arguments: &[String], input: Option<&[u8]>) -> Result<Invocation, OcrError> {
        let start = Instant::now();
        tracing::debug!(
            "Running {} {}",
            self.config.binary.display(),
            arguments.join(" ")
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let Captured {
            status,
            stdout,
            stderr,
        } = runtime.block_on(self.execute(arguments, input))?;

        tracing::debug!(
            "tesseract exited with {} after {}ms",
            status,
            start.elapsed().as_millis()
        );

        if status.success() {
            Ok(Invocation::Succeeded(String::from_utf8(stdout)?))
        } else {
            let stderr = String::from_utf8(stderr)?;
            tracing::warn!("tesseract failed ({}): {}", status, stderr.trim());
            Ok(Invocation::Failed {
                code: status.code(),
                stderr,
            })
        }
    }
}

/// Feed stdin and drain both output pipes concurrently so a child that fills
/// one pipe never blocks on another, then reap it.
async fn communicate(child: &mut Child, input: Option<&[u8]>) -> Result<Captured, OcrError> {
    let (_, stdout, stderr) = tokio::try_join!(
        feed(child.stdin.take(), input),
        drain(child.stdout.take()),
        drain(child.stderr.take()),
    )?;
    let status = child.wait().await?;
    Ok(Captured {
        status,
        stdout,
        stderr,
    })
}

async fn feed(stdin: Option<ChildStdin>, input: Option<&[u8]>) -> std::io::Result<()> {
    let (Some(mut stdin), Some(bytes)) = (stdin, input) else {
        return Ok(());
    };
    match stdin.write_all(bytes).await {
        // Dropping stdin closes the pipe
        Ok(()) => Ok(()),
        // The engine may exit without consuming its whole input
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            tracing::debug!("tesseract closed stdin early");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}
