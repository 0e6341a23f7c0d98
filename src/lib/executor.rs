//! Subprocess execution with timeout, output ceiling and optional elevation
//!
//! [`Executor`] is the single place where commands leave the process. Each
//! run either resolves with trimmed stdout (exit code 0) or fails with
//! [`Error::ExecutionFailed`]; every failure is reported to the injected
//! [`LogSink`] before it is returned.

use std::env;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::Instrument;
use uuid::Uuid;

use crate::admission::AdmissionGate;
use crate::command_builder::{CommandBuilder, InlineCommand, RegistryQuery, Script, ScriptArg};
use crate::config::ExecutorConfig;
use crate::elevation;
use crate::error::{Error, FailureCause, Result};
use crate::log_sink::LogSink;

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Script { script: Script, args: Vec<ScriptArg> },
    Inline(InlineCommand),
    Registry(RegistryQuery),
}

impl Target {
    /// Short name used in logs and busy messages
    pub fn name(&self) -> &'static str {
        match self {
            Target::Script { script, .. } => script.file_name(),
            Target::Inline(command) => command.name(),
            Target::Registry(_) => "registry-query",
        }
    }
}

/// A single subprocess run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub target: Target,
    pub elevate: bool,
    /// Overrides the executor's configured timeout
    pub timeout: Option<Duration>,
    /// Overrides the executor's configured output ceiling
    pub max_output_bytes: Option<usize>,
}

impl ExecutionRequest {
    pub fn script(script: Script, args: Vec<ScriptArg>) -> Self {
        Self {
            target: Target::Script { script, args },
            elevate: false,
            timeout: None,
            max_output_bytes: None,
        }
    }

    pub fn inline(command: InlineCommand) -> Self {
        Self {
            target: Target::Inline(command),
            elevate: false,
            timeout: None,
            max_output_bytes: None,
        }
    }

    pub fn registry_query(query: RegistryQuery) -> Self {
        Self {
            target: Target::Registry(query),
            elevate: false,
            timeout: None,
            max_output_bytes: None,
        }
    }

    pub fn elevated(mut self) -> Self {
        self.elevate = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Output of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// Trimmed stdout
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionOutput {
    /// stdout and stderr joined, for marker scanning
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs execution requests; implemented by [`Executor`] and by test doubles
#[async_trait]
pub trait Execute: Send + Sync {
    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionOutput>;
}

/// Resource bounds applied to one subprocess
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

/// Decoded output of a finished process, before exit-code interpretation
#[derive(Debug, Default)]
pub(crate) struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Production executor
pub struct Executor {
    builder: CommandBuilder,
    config: ExecutorConfig,
    sink: Arc<dyn LogSink>,
    gate: AdmissionGate,
}

impl Executor {
    pub fn new(config: ExecutorConfig, builder: CommandBuilder, sink: Arc<dyn LogSink>) -> Self {
        Self {
            builder,
            config,
            sink,
            gate: AdmissionGate::new(),
        }
    }

    /// Share an existing gate (e.g. between several executors)
    pub fn with_gate(mut self, gate: AdmissionGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    fn command_line(&self, target: &Target) -> String {
        match target {
            Target::Script { script, args } => self.builder.build_script_command(*script, args),
            Target::Inline(command) => self.builder.build_inline_command(command),
            Target::Registry(query) => self.builder.build_registry_query(query),
        }
    }

    async fn run_inner(&self, request: &ExecutionRequest) -> Result<ExecutionOutput> {
        let name = request.target.name();
        let limits = Limits {
            timeout: request.timeout.unwrap_or(self.config.timeout),
            max_output_bytes: request
                .max_output_bytes
                .unwrap_or(self.config.max_output_bytes),
        };
        let command = self.command_line(&request.target);
        tracing::debug!(%command, "running");

        let raw = if request.elevate {
            let _admission = self.gate.try_admit(name)?;
            elevation::run_elevated(&command, &self.config.app_name, limits).await?
        } else {
            run_plain(&command, limits).await?
        };

        interpret(raw)
    }
}

#[async_trait]
impl Execute for Executor {
    async fn run(&self, request: ExecutionRequest) -> Result<ExecutionOutput> {
        let op_id = Uuid::new_v4();
        let name = request.target.name();
        let span =
            tracing::info_span!("exec", op = %op_id, operation = name, elevate = request.elevate);

        let result = self.run_inner(&request).instrument(span).await;
        if let Err(ref e) = result {
            self.sink.error(name, &e.to_string());
        }
        result
    }
}

/// Map a finished process onto the success / failure contract
pub(crate) fn interpret(raw: RawOutput) -> Result<ExecutionOutput> {
    match raw.exit_code {
        Some(0) => Ok(ExecutionOutput {
            stdout: raw.stdout.trim().to_string(),
            stderr: raw.stderr,
            exit_code: 0,
        }),
        code => {
            let stderr = raw.stderr.trim();
            let message = if !stderr.is_empty() {
                stderr.to_string()
            } else {
                match code {
                    Some(c) => format!("process exited with code {}", c),
                    None => "process was terminated by a signal".to_string(),
                }
            };
            Err(Error::execution(FailureCause::NonZeroExit(code), message))
        }
    }
}

/// Get the shell used for unprivileged runs
pub fn get_shell() -> (String, String) {
    if cfg!(windows) {
        ("cmd.exe".to_string(), "/c".to_string())
    } else {
        let shell = env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        (shell, "-c".to_string())
    }
}

async fn run_plain(command: &str, limits: Limits) -> Result<RawOutput> {
    collect(shell_command(command), limits).await
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let (shell, _) = get_shell();
    let mut cmd = Command::new(shell);
    cmd.args(["/d", "/s", "/c"]).raw_arg(format!("\"{}\"", command));
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let (shell, shell_arg) = get_shell();
    let mut cmd = Command::new(shell);
    cmd.arg(shell_arg).arg(command);
    cmd
}

/// Spawn `cmd`, read both pipes under the output ceiling and wait for exit,
/// all within the timeout. The child is killed on any failure.
pub(crate) async fn collect(mut cmd: Command, limits: Limits) -> Result<RawOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::execution(FailureCause::Io, format!("failed to start process: {}", e)))?;

    let stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| Error::execution(FailureCause::Io, "failed to capture stdout"))?;
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| Error::execution(FailureCause::Io, "failed to capture stderr"))?;

    let work = async {
        let (stdout, stderr) = tokio::try_join!(
            read_capped(stdout_pipe, limits.max_output_bytes),
            read_capped(stderr_pipe, limits.max_output_bytes)
        )?;
        let status = child.wait().await.map_err(|e| {
            Error::execution(FailureCause::Io, format!("failed to wait for process: {}", e))
        })?;
        Ok::<_, Error>(RawOutput {
            stdout: decode_output(&stdout),
            stderr: decode_output(&stderr),
            exit_code: status.code(),
        })
    };

    match tokio::time::timeout(limits.timeout, work).await {
        Ok(Ok(raw)) => Ok(raw),
        Ok(Err(e)) => {
            terminate(&mut child).await;
            Err(e)
        }
        Err(_) => {
            terminate(&mut child).await;
            Err(Error::execution(
                FailureCause::Timeout,
                format!("timed out after {} ms", limits.timeout.as_millis()),
            ))
        }
    }
}

async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await.map_err(|e| {
            Error::execution(FailureCause::Io, format!("failed to read output: {}", e))
        })?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() + n > limit {
            return Err(Error::execution(
                FailureCause::OutputLimit,
                format!("output exceeded {} bytes", limit),
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Kill the child and everything it started
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // The child leads its own process group (see `collect`)
            unsafe {
                libc::killpg(pid as libc::pid_t, libc::SIGKILL);
            }
        }
    }

    #[cfg(windows)]
    {
        if let Some(pid) = child.id() {
            let _ = Command::new("taskkill")
                .args(["/T", "/F", "/PID", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
        }
    }

    let _ = child.start_kill();
    let _ = child.wait().await;
}

/// Decode process output
///
/// The system file checker writes UTF-16LE to pipes, so UTF-16LE (with or
/// without BOM) is detected; everything else is lossy UTF-8 with any
/// leading BOM removed.
pub fn decode_output(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16le(rest);
    }
    if looks_like_utf16le(bytes) {
        return decode_utf16le(bytes);
    }
    let text = String::from_utf8_lossy(bytes);
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text.into_owned(),
    }
}

fn looks_like_utf16le(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }
    let pairs = bytes.len() / 2;
    let nul_high = bytes.chunks_exact(2).filter(|pair| pair[1] == 0).count();
    nul_high * 10 >= pairs * 9
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}
