//! Elevated execution through the OS consent mechanism
//!
//! Windows: the command is written to a temporary batch file that redirects
//! its own stdout/stderr into files next to it. A non-elevated PowerShell
//! host (`-EncodedCommand`, so no quoting survives into the command line)
//! launches the batch file with `Start-Process -Verb RunAs -Wait` and exits
//! with its exit code. Cancelling the UAC prompt exits with
//! `ERROR_CANCELLED` (1223).
//!
//! Elsewhere: `sudo -n <shell> -c <command>`.

use crate::error::{Error, FailureCause, Result};
use crate::executor::{Limits, RawOutput};

/// Exit code used when the consent prompt is cancelled
pub const ERROR_CANCELLED: i32 = 1223;

/// Encode a script for `powershell -EncodedCommand` (base64 of UTF-16LE)
pub fn encode_powershell(script: &str) -> String {
    use base64::Engine;

    let utf16: Vec<u8> = script
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    base64::engine::general_purpose::STANDARD.encode(utf16)
}

/// Quote a value as a PowerShell single-quoted string literal
pub fn powershell_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// PowerShell script that raises the consent prompt for `batch_path`
pub fn launcher_script(batch_path: &str) -> String {
    format!(
        "try {{ $p = Start-Process -FilePath {} -Verb RunAs -WindowStyle Hidden -Wait -PassThru -ErrorAction Stop }} \
         catch {{ [Console]::Error.WriteLine($_.Exception.Message); exit {} }}\n\
         exit $p.ExitCode",
        powershell_literal(batch_path),
        ERROR_CANCELLED
    )
}

/// Batch file body running `command` with its output redirected
pub fn batch_script(command: &str, title: &str, stdout_path: &str, stderr_path: &str) -> String {
    format!(
        "@echo off\r\ntitle {}\r\n{} > \"{}\" 2> \"{}\"\r\nexit /b %errorlevel%\r\n",
        title, command, stdout_path, stderr_path
    )
}

/// Map a failed elevation attempt onto `ElevationDenied`
fn check_denied(raw: &RawOutput) -> Result<()> {
    if is_denied(raw) {
        let detail = raw.stderr.trim();
        let message = if detail.is_empty() {
            "elevation request was denied".to_string()
        } else {
            format!("elevation request was denied: {}", detail)
        };
        return Err(Error::execution(FailureCause::ElevationDenied, message));
    }
    Ok(())
}

#[cfg(windows)]
fn is_denied(raw: &RawOutput) -> bool {
    raw.exit_code == Some(ERROR_CANCELLED)
}

#[cfg(not(windows))]
fn is_denied(raw: &RawOutput) -> bool {
    raw.exit_code == Some(1)
        && (raw.stderr.contains("sudo: a password is required")
            || raw.stderr.contains("is not in the sudoers file"))
}

#[cfg(windows)]
pub(crate) async fn run_elevated(command: &str, app_name: &str, limits: Limits) -> Result<RawOutput> {
    use tokio::process::Command;

    use crate::executor::{collect, decode_output};

    let workdir = tempfile::Builder::new().prefix("pc-buddy-").tempdir()?;
    let batch_path = workdir.path().join("run.cmd");
    let stdout_path = workdir.path().join("stdout.txt");
    let stderr_path = workdir.path().join("stderr.txt");

    let batch = batch_script(
        command,
        app_name,
        &stdout_path.to_string_lossy(),
        &stderr_path.to_string_lossy(),
    );
    tokio::fs::write(&batch_path, batch).await?;

    let encoded = encode_powershell(&launcher_script(&batch_path.to_string_lossy()));
    let mut launcher = Command::new("powershell.exe");
    launcher.args([
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-EncodedCommand",
        encoded.as_str(),
    ]);

    let outer = collect(launcher, limits).await?;
    check_denied(&outer)?;

    let stdout = read_capped_file(&stdout_path, limits.max_output_bytes).await?;
    let stderr = read_capped_file(&stderr_path, limits.max_output_bytes).await?;

    Ok(RawOutput {
        stdout: decode_output(&stdout),
        stderr: if stderr.is_empty() {
            outer.stderr
        } else {
            decode_output(&stderr)
        },
        exit_code: outer.exit_code,
    })
}

#[cfg(windows)]
async fn read_capped_file(path: &std::path::Path, limit: usize) -> Result<Vec<u8>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > limit as u64 => Err(Error::execution(
            FailureCause::OutputLimit,
            format!("output exceeded {} bytes", limit),
        )),
        Ok(_) => Ok(tokio::fs::read(path).await?),
        Err(_) => Ok(Vec::new()),
    }
}

#[cfg(not(windows))]
pub(crate) async fn run_elevated(command: &str, _app_name: &str, limits: Limits) -> Result<RawOutput> {
    use tokio::process::Command;

    use crate::executor::{collect, get_shell};

    let (shell, shell_arg) = get_shell();
    let mut sudo = Command::new("sudo");
    sudo.args(["-n", shell.as_str(), shell_arg.as_str(), command]);

    let raw = collect(sudo, limits).await?;
    check_denied(&raw)?;
    Ok(raw)
}
