use camino::{Utf8Path, Utf8PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::{Child, ChildStdin, Command};

/// Errors from opening, writing to, or closing a [`ProcessPipe`]
#[derive(Error, Debug)]
pub enum PipeError {
    #[error("Executable not found: {0}")]
    ExecutableNotFound(Utf8PathBuf),

    #[error("Process is already open; close it first")]
    AlreadyOpen,

    #[error("Process is not open")]
    NotOpen,

    #[error("Failed to spawn {path}: {source}")]
    Spawn {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write to process: {0}")]
    Write(std::io::Error),

    #[error("Process closed with errors: {}", .0.join("; "))]
    Close(Vec<String>),
}

/// Lifecycle state of a [`ProcessPipe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
    Closed,
    Open,
}

/// Owns one child process and the write side of its standard input.
///
/// The child's stdout and stderr are inherited from the launcher and never
/// read here. Writes to stdin are buffered until [`flush`](Self::flush) or
/// [`close`](Self::close). Callers must not call [`open`](Self::open) and
/// [`close`](Self::close) concurrently; wrap the pipe in a mutex or keep it on
/// one task.
#[derive(Debug, Default)]
pub struct ProcessPipe {
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    executable: Option<Utf8PathBuf>,
    working_dir: Option<Utf8PathBuf>,
}

impl ProcessPipe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run future children from `dir` instead of the launcher's working directory.
    pub fn with_working_dir<P: AsRef<Utf8Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn set_working_dir(&mut self, dir: Option<Utf8PathBuf>) {
        self.working_dir = dir;
    }

    pub fn state(&self) -> PipeState {
        if self.child.is_some() {
            PipeState::Open
        } else {
            PipeState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == PipeState::Open
    }

    /// Executable of the currently open child.
    pub fn executable(&self) -> Option<&Utf8Path> {
        self.executable.as_deref()
    }

    /// OS process id of the open child, if it is still known.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Spawn `executable` with `args` and attach to its standard input.
    ///
    /// On any failure the pipe stays closed.
    pub fn open(&mut self, executable: &Utf8Path, args: &[String]) -> Result<(), PipeError> {
        if self.is_open() {
            tracing::warn!("Refusing to open {}: a process is already open", executable);
            return Err(PipeError::AlreadyOpen);
        }

        if !executable.is_file() {
            tracing::error!("Executable not found: {}", executable);
            return Err(PipeError::ExecutableNotFound(executable.to_path_buf()));
        }

        let mut cmd = Command::new(executable.as_std_path());
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::info!("Spawning: {} {}", executable, args.join(" "));

        let mut child = cmd.spawn().map_err(|source| {
            tracing::error!("Failed to spawn {}: {}", executable, source);
            PipeError::Spawn {
                path: executable.to_path_buf(),
                source,
            }
        })?;

        self.stdin = child.stdin.take().map(BufWriter::new);
        tracing::info!("Process started with pid {:?}", child.id());
        self.child = Some(child);
        self.executable = Some(executable.to_path_buf());

        Ok(())
    }

    /// Queue one line for the child's standard input.
    pub async fn write_line(&mut self, line: &str) -> Result<(), PipeError> {
        let stdin = self.stdin.as_mut().ok_or(PipeError::NotOpen)?;
        stdin
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .map_err(PipeError::Write)
    }

    /// Send queued lines to the child.
    pub async fn flush(&mut self) -> Result<(), PipeError> {
        let stdin = self.stdin.as_mut().ok_or(PipeError::NotOpen)?;
        stdin.flush().await.map_err(PipeError::Write)
    }

    /// Check whether the child exited on its own.
    ///
    /// An exited child closes the pipe and its exit status is returned.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, PipeError> {
        let Some(child) = self.child.as_mut() else {
            return Err(PipeError::NotOpen);
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!("Process exited with {}", status);
                self.stdin = None;
                self.child = None;
                self.executable = None;
                Ok(Some(status))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!("Failed to poll process status: {}", e);
                Ok(None)
            }
        }
    }

    /// Release stdin and request termination of the child.
    ///
    /// Does not wait for the child to exit. The pipe ends up closed even when
    /// a step fails; the failures are reported together afterwards. Closing a
    /// closed pipe succeeds.
    pub async fn close(&mut self) -> Result<(), PipeError> {
        let mut errors = Vec::new();

        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush().await {
                errors.push(format!("flush stdin: {}", e));
            }
            if let Err(e) = stdin.shutdown().await {
                errors.push(format!("close stdin: {}", e));
            }
        }

        if let Some(mut child) = self.child.take() {
            let still_running = matches!(child.try_wait(), Ok(None));
            if still_running {
                if let Err(e) = child.start_kill() {
                    errors.push(format!("kill: {}", e));
                } else {
                    tracing::info!("Termination requested for pid {:?}", child.id());
                }
            }
            // Dropping the handle is fine: the kill request is already out.
        }

        self.executable = None;

        if errors.is_empty() {
            Ok(())
        } else {
            tracing::warn!("Process closed with errors: {}", errors.join("; "));
            Err(PipeError::Close(errors))
        }
    }
}
