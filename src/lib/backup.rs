//! Backup location resolution and backup script invocation
//!
//! The backup directory preference lives in the registry, under the key and
//! value named by [`BackupConfig`]. Reading it is allowed to fail: a missing or unreadable value falls back to
//! `{home}/Documents/PC-Buddy-Backups`. Whatever path is chosen must pass
//! path validation before it reaches a script.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::command_builder::{RegistryQuery, Script, ScriptArg};
use crate::config::{BackupConfig, DEFAULT_BACKUP_FOLDER};
use crate::error::{Error, Result};
use crate::executor::{Execute, ExecutionRequest};
use crate::log_sink::LogSink;
use crate::validator::{sanitize, validate_path, ValidatedPath};

static LOOSE_VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)REG_(?:EXPAND_)?SZ\s+(.+?)\s*$").expect("static regex")
});

/// Extract the data of `value_name` from `reg query` output
///
/// A line naming the value wins; otherwise the first string-typed line is
/// taken.
pub fn parse_registry_value(output: &str, value_name: &str) -> Option<String> {
    let named = Regex::new(&format!(
        r"(?mi)^\s*{}\s+REG_(?:EXPAND_)?SZ\s+(.+?)\s*$",
        regex::escape(value_name)
    ))
    .ok();

    named
        .iter()
        .chain(std::iter::once(&*LOOSE_VALUE_PATTERN))
        .find_map(|re| re.captures(output))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|value| !value.is_empty())
}

/// `{home}/Documents/PC-Buddy-Backups`
pub fn default_backup_path(home: &Path) -> PathBuf {
    home.join("Documents").join(DEFAULT_BACKUP_FOLDER)
}

/// Where a resolved path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPathSource {
    Registry,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPathResolution {
    pub path: ValidatedPath,
    pub source: BackupPathSource,
}

/// Backup scripts that take the resolved location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupScript {
    /// Creates a backup; mutates state, so it runs elevated
    Create,
    /// Reports on existing backups; read-only
    Info,
}

impl BackupScript {
    fn script(&self) -> Script {
        match self {
            BackupScript::Create => Script::CreateBackup,
            BackupScript::Info => Script::BackupInfo,
        }
    }

    fn elevate(&self) -> bool {
        matches!(self, BackupScript::Create)
    }

    fn context(&self) -> &'static str {
        match self {
            BackupScript::Create => "backup-create",
            BackupScript::Info => "backup-info",
        }
    }
}

pub struct BackupPathResolver {
    executor: Arc<dyn Execute>,
    sink: Arc<dyn LogSink>,
    home_dir: Option<PathBuf>,
    registry_key: String,
    value_name: String,
}

impl BackupPathResolver {
    pub fn new(executor: Arc<dyn Execute>, config: &BackupConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            executor,
            sink,
            home_dir: config.home_dir.clone(),
            registry_key: config.registry_key.clone(),
            value_name: config.value_name.clone(),
        }
    }

    /// Resolve and validate the backup directory
    pub async fn resolve(&self) -> Result<ValidatedPath> {
        Ok(self.resolve_detailed().await?.path)
    }

    /// Like [`resolve`](Self::resolve), also reporting where the path came from
    pub async fn resolve_detailed(&self) -> Result<BackupPathResolution> {
        if let Some(value) = self.query_registry().await {
            match validate_path(&value) {
                Ok(path) => {
                    self.sink
                        .log("backup", &format!("using configured backup location {}", path));
                    return Ok(BackupPathResolution {
                        path,
                        source: BackupPathSource::Registry,
                    });
                }
                Err(e) => {
                    self.sink.error(
                        "backup",
                        &format!("ignoring configured backup location: {}", e),
                    );
                }
            }
        }

        let home = self
            .home_dir
            .as_deref()
            .ok_or_else(|| Error::InvalidPath("home directory is unavailable".to_string()))?;
        let default = default_backup_path(home);
        let path = validate_path(&default.to_string_lossy())?;
        self.sink
            .log("backup", &format!("using default backup location {}", path));
        Ok(BackupPathResolution {
            path,
            source: BackupPathSource::Default,
        })
    }

    async fn query_registry(&self) -> Option<String> {
        let query = match (sanitize(&self.registry_key), sanitize(&self.value_name)) {
            (Ok(key), Ok(value_name)) => RegistryQuery::new(key, value_name),
            (Err(e), _) | (_, Err(e)) => {
                self.sink
                    .error("backup", &format!("registry location is unusable: {}", e));
                return None;
            }
        };

        match self.executor.run(ExecutionRequest::registry_query(query)).await {
            Ok(output) => {
                let value = parse_registry_value(&output.stdout, &self.value_name);
                if value.is_none() {
                    self.sink
                        .log("backup", "registry output did not contain a backup location");
                }
                value
            }
            Err(e) => {
                self.sink
                    .log("backup", &format!("no configured backup location: {}", e));
                None
            }
        }
    }

    /// Run a backup script with `-BackupLocation "<resolved path>"` ahead of
    /// `extra_args`
    pub async fn with_resolved_path(
        &self,
        script: BackupScript,
        extra_args: &[String],
    ) -> Result<String> {
        let resolved = self.resolve().await?;
        let location = resolved.sanitized();
        if location.as_str() != resolved.as_str() {
            self.sink.log(
                script.context(),
                &format!("backup location {} is passed as {}", resolved, location),
            );
        }

        let mut args = vec![ScriptArg::named("-BackupLocation", location.clone())];
        for extra in extra_args {
            args.push(ScriptArg::positional(sanitize(extra)?));
        }

        let mut request = ExecutionRequest::script(script.script(), args);
        if script.elevate() {
            request = request.elevated();
        }

        self.sink.log(script.context(), &format!("running with {}", location));
        let output = self.executor.run(request).await?;

        if output.stdout.is_empty() && script == BackupScript::Create {
            return Ok(format!("Backup created in {}.", location));
        }
        Ok(output.stdout)
    }

    pub async fn create_backup(&self, extra_args: &[String]) -> Result<String> {
        self.with_resolved_path(BackupScript::Create, extra_args).await
    }

    pub async fn backup_info(&self) -> Result<String> {
        self.with_resolved_path(BackupScript::Info, &[]).await
    }
}
