//! Command construction for scripts and fixed inline operations
//!
//! Every command runs through a non-interactive PowerShell host with the
//! execution policy bypassed. The builder never decides trust: script
//! arguments must already be [`SanitizedString`]s, and inline commands can
//! only come from the fixed set defined on [`InlineCommand`].

use std::path::PathBuf;

use crate::config::ScriptConfig;
use crate::validator::SanitizedString;

/// PowerShell host invocation shared by every command
pub const POWERSHELL_PREFIX: &str =
    "powershell.exe -NoProfile -NonInteractive -ExecutionPolicy Bypass";

/// External scripts shipped next to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    ListStartupPrograms,
    ToggleStartupProgram,
    CreateBackup,
    BackupInfo,
}

impl Script {
    pub fn file_name(&self) -> &'static str {
        match self {
            Script::ListStartupPrograms => "get-startup-programs.ps1",
            Script::ToggleStartupProgram => "toggle-startup-program.ps1",
            Script::CreateBackup => "create-backup.ps1",
            Script::BackupInfo => "get-backup-info.ps1",
        }
    }
}

/// One script argument, optionally introduced by a `-Flag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptArg {
    flag: Option<&'static str>,
    value: SanitizedString,
}

impl ScriptArg {
    pub fn named(flag: &'static str, value: SanitizedString) -> Self {
        Self {
            flag: Some(flag),
            value,
        }
    }

    pub fn positional(value: SanitizedString) -> Self {
        Self { flag: None, value }
    }

    pub fn flag(&self) -> Option<&'static str> {
        self.flag
    }

    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    fn render(&self) -> String {
        match self.flag {
            Some(flag) => format!("{} {}", flag, quote(self.value.as_str())),
            None => quote(self.value.as_str()),
        }
    }
}

/// A literal command from the fixed set of maintenance operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineCommand {
    name: &'static str,
    text: &'static str,
}

impl InlineCommand {
    /// First-stage system file integrity scan
    pub const SYSTEM_FILE_SCAN: InlineCommand = InlineCommand {
        name: "system-file-scan",
        text: "sfc /scannow",
    };

    /// Second-stage component store repair
    pub const DEEP_REPAIR: InlineCommand = InlineCommand {
        name: "deep-repair",
        text: "DISM /Online /Cleanup-Image /RestoreHealth",
    };

    pub const DISK_CLEANUP: InlineCommand = InlineCommand {
        name: "disk-cleanup",
        text: "Start-Process -FilePath cleanmgr.exe -ArgumentList '/sagerun:1' -Wait",
    };

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn text(&self) -> &'static str {
        self.text
    }
}

/// Read-only `reg query <key> /v <value>` against a configured location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryQuery {
    key: SanitizedString,
    value_name: SanitizedString,
}

impl RegistryQuery {
    pub fn new(key: SanitizedString, value_name: SanitizedString) -> Self {
        Self { key, value_name }
    }

    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    pub fn value_name(&self) -> &str {
        self.value_name.as_str()
    }

    fn text(&self) -> String {
        format!(
            "reg query {} /v {}",
            single_quote(self.key.as_str()),
            single_quote(self.value_name.as_str())
        )
    }
}

/// Builds shell-invocable command lines
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    scripts_dir: PathBuf,
}

impl CommandBuilder {
    pub fn new(config: &ScriptConfig) -> Self {
        Self {
            scripts_dir: config.scripts_dir.clone(),
        }
    }

    pub fn script_path(&self, script: Script) -> PathBuf {
        self.scripts_dir.join(script.file_name())
    }

    /// Wrap a script invocation with its space-joined arguments
    pub fn build_script_command(&self, script: Script, args: &[ScriptArg]) -> String {
        let mut command = format!(
            "{} -File {}",
            POWERSHELL_PREFIX,
            quote(&self.script_path(script).to_string_lossy())
        );
        for arg in args {
            command.push(' ');
            command.push_str(&arg.render());
        }
        command
    }

    /// Wrap one of the fixed inline commands
    pub fn build_inline_command(&self, command: &InlineCommand) -> String {
        format!("{} -Command \"{}\"", POWERSHELL_PREFIX, command.text)
    }

    /// Wrap a registry value query
    pub fn build_registry_query(&self, query: &RegistryQuery) -> String {
        format!("{} -Command \"{}\"", POWERSHELL_PREFIX, query.text())
    }
}

/// Double-quote a value for the command line
///
/// `"` would end the quoted region and cmd.exe expands `%VAR%` even inside
/// quotes, so both are dropped.
fn quote(value: &str) -> String {
    let inner: String = value.chars().filter(|c| *c != '"' && *c != '%').collect();
    format!("\"{}\"", inner)
}

/// Single-quote a value inside an already double-quoted `-Command`
fn single_quote(value: &str) -> String {
    let inner: String = value
        .chars()
        .filter(|c| !matches!(c, '"' | '%' | '\''))
        .collect();
    format!("'{}'", inner)
}
