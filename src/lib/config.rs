//! Configuration for pc-buddy
//!
//! All values are read once (usually from environment variables) and then
//! handed to the components that need them.
//!
//! Environment variables:
//! - `PC_BUDDY_SCRIPTS_DIR`        directory holding the maintenance scripts
//! - `PC_BUDDY_TIMEOUT_MS`         subprocess timeout in milliseconds
//! - `PC_BUDDY_MAX_OUTPUT_BYTES`   stdout/stderr ceiling per subprocess
//! - `PC_BUDDY_VERBOSE`            verbose logging (`1` or `true`)
//! - `PC_BUDDY_OUTPUT_STYLE`       CLI block style
//! - `PC_BUDDY_REGISTRY_KEY`       registry key holding persisted preferences

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default subprocess timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default stdout/stderr ceiling (10 MiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
/// Name shown on elevation prompts and in logs
pub const APP_NAME: &str = "PC Buddy";
/// Default registry namespace holding persisted preferences
pub const DEFAULT_REGISTRY_KEY: &str = r"HKCU\Software\PC-Buddy";
/// Default registry value naming the backup directory
pub const DEFAULT_BACKUP_VALUE_NAME: &str = "BackupLocation";
/// Folder created under the user's Documents directory by default
pub const DEFAULT_BACKUP_FOLDER: &str = "PC-Buddy-Backups";
/// Prefix of the per-call file the startup enumeration script writes JSON to
pub const STARTUP_JSON_PREFIX: &str = "pc-buddy-startup-";

/// Resource limits and naming for subprocess execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub timeout: Duration,
    pub max_output_bytes: usize,
    pub app_name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            app_name: APP_NAME.to_string(),
        }
    }
}

/// Where the external scripts live
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    pub scripts_dir: PathBuf,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        let scripts_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("scripts")))
            .unwrap_or_else(|| PathBuf::from("scripts"));
        Self { scripts_dir }
    }
}

/// Startup enumeration settings
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Directory that receives each enumeration's JSON hand-off file
    pub temp_dir: PathBuf,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            temp_dir: env::temp_dir(),
        }
    }
}

/// Backup path resolution settings
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Home directory used for the default path (None when unknown)
    pub home_dir: Option<PathBuf>,
    /// Registry key the backup location is read from
    pub registry_key: String,
    /// Registry value holding the backup location
    pub value_name: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            home_dir: dirs::home_dir(),
            registry_key: DEFAULT_REGISTRY_KEY.to_string(),
            value_name: DEFAULT_BACKUP_VALUE_NAME.to_string(),
        }
    }
}

/// Complete configuration, usually built from the environment
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub executor: ExecutorConfig,
    pub scripts: ScriptConfig,
    pub startup: StartupConfig,
    pub backup: BackupConfig,
    pub verbose: bool,
    pub output_style: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(dir) = env::var("PC_BUDDY_SCRIPTS_DIR") {
            config.scripts.scripts_dir = PathBuf::from(dir);
        }
        if let Some(ms) = env_u64("PC_BUDDY_TIMEOUT_MS") {
            config.executor.timeout = Duration::from_millis(ms);
        }
        if let Some(bytes) = env_u64("PC_BUDDY_MAX_OUTPUT_BYTES") {
            config.executor.max_output_bytes = bytes as usize;
        }
        config.verbose = env_bool("PC_BUDDY_VERBOSE");
        config.output_style = env::var("PC_BUDDY_OUTPUT_STYLE").ok();
        if let Ok(key) = env::var("PC_BUDDY_REGISTRY_KEY") {
            config.backup.registry_key = key;
        }

        config
    }
}

fn env_bool(name: &str) -> bool {
    env::var(name).is_ok_and(|v| v == "1" || v == "true")
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
