//! Startup program enumeration and toggling
//!
//! The enumeration script reports the programs that start with Windows as
//! JSON. Each call re-enumerates; nothing is cached, so a toggle always
//! targets the entry as it exists right now. Every enumeration gets its own
//! hand-off file, so concurrent listings never see each other's output.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::command_builder::{Script, ScriptArg};
use crate::config::{StartupConfig, STARTUP_JSON_PREFIX};
use crate::error::{Error, Result};
use crate::executor::{decode_output, Execute, ExecutionRequest};
use crate::log_sink::LogSink;
use crate::validator::{sanitize, validate_path};

/// Risk rating the enumeration script assigns to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Safety {
    Safe,
    Caution,
    Danger,
    Unknown,
}

impl Safety {
    fn parse(value: Option<&str>) -> Safety {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("safe") => Safety::Safe,
            Some("caution") => Safety::Caution,
            Some("danger") => Safety::Danger,
            _ => Safety::Unknown,
        }
    }

    /// Sort priority: safe entries surface first
    pub fn priority(&self) -> u8 {
        match self {
            Safety::Danger => 3,
            Safety::Caution => 2,
            Safety::Safe | Safety::Unknown => 1,
        }
    }
}

/// One record as emitted by the enumeration script
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStartupItem {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "RegistryName", default)]
    pub registry_name: Option<String>,
    #[serde(rename = "Source", default)]
    pub source: Option<String>,
    #[serde(rename = "Command", default)]
    pub command: Option<String>,
    #[serde(rename = "Safety", default)]
    pub safety: Option<String>,
}

/// A normalized startup entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupItem {
    pub name: String,
    pub registry_name: String,
    pub source: String,
    pub command: String,
    pub safety: Safety,
    pub priority: u8,
    pub original_index: usize,
}

impl StartupItem {
    /// Apply the default rules to a raw record
    pub fn from_raw(raw: RawStartupItem, original_index: usize) -> Self {
        let name = non_blank(raw.name).unwrap_or_else(|| "Unnamed".to_string());
        let registry_name = non_blank(raw.registry_name).unwrap_or_else(|| name.clone());
        let source = non_blank(raw.source).unwrap_or_else(|| "Unknown".to_string());
        let command = non_blank(raw.command).unwrap_or_else(|| format!("{}.exe", name));
        let safety = Safety::parse(raw.safety.as_deref());

        StartupItem {
            name,
            registry_name,
            source,
            command,
            priority: safety.priority(),
            safety,
            original_index,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse enumeration output into normalized items, in enumeration order
pub fn parse_startup_json(text: &str) -> Result<Vec<StartupItem>> {
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let document: Value = serde_json::from_str(text)
        .map_err(|e| Error::ParseFailed(format!("startup list is not valid JSON: {}", e)))?;

    // PowerShell emits a bare object when there is exactly one entry
    let records = match document {
        Value::Array(records) => records,
        record @ Value::Object(_) => vec![record],
        other => {
            return Err(Error::ParseFailed(format!(
                "expected a list of startup programs, got {}",
                json_kind(&other)
            )))
        }
    };

    let raw = records
        .into_iter()
        .map(|record| match record {
            Value::Object(_) => serde_json::from_value::<RawStartupItem>(record)
                .map_err(|e| Error::ParseFailed(format!("malformed startup record: {}", e))),
            other => Err(Error::ParseFailed(format!(
                "expected a startup record, got {}",
                json_kind(&other)
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(index, item)| StartupItem::from_raw(item, index))
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Stable sort by (priority, original index)
pub fn sort_by_priority(items: &mut [StartupItem]) {
    items.sort_by_key(|item| (item.priority, item.original_index));
}

pub struct StartupRegistry {
    executor: Arc<dyn Execute>,
    sink: Arc<dyn LogSink>,
    temp_dir: PathBuf,
}

impl StartupRegistry {
    pub fn new(executor: Arc<dyn Execute>, config: &StartupConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            executor,
            sink,
            temp_dir: config.temp_dir.clone(),
        }
    }

    /// Enumerate startup programs, safest first
    pub async fn list(&self) -> Result<Vec<StartupItem>> {
        let mut items = self.enumerate().await?;
        sort_by_priority(&mut items);
        Ok(items)
    }

    /// A fresh hand-off path for one enumeration
    fn hand_off_path(&self) -> PathBuf {
        self.temp_dir
            .join(format!("{}{}.json", STARTUP_JSON_PREFIX, Uuid::new_v4()))
    }

    async fn enumerate(&self) -> Result<Vec<StartupItem>> {
        let json_path = self.hand_off_path();
        // The script writes where it is told and we read back the same path,
        // so it must survive sanitization untouched
        let output_path = validate_path(&json_path.to_string_lossy())
            .and_then(|path| path.exact_argument())
            .inspect_err(|e| self.sink.error("startup", &e.to_string()))?;

        let request = ExecutionRequest::script(
            Script::ListStartupPrograms,
            vec![ScriptArg::named("-OutputPath", output_path)],
        );

        let result = self.executor.run(request).await;
        let written = tokio::fs::read(&json_path).await;
        let _ = tokio::fs::remove_file(&json_path).await;

        let output = result.map_err(|e| {
            self.sink.error("startup", &format!("enumeration failed: {}", e));
            Error::EnumerationFailed(e.to_string())
        })?;

        let text = match written {
            Ok(bytes) => decode_output(&bytes),
            Err(_) if !output.stdout.trim().is_empty() => output.stdout,
            Err(e) => {
                let message = format!(
                    "enumeration produced no output ({}: {})",
                    json_path.display(),
                    e
                );
                self.sink.error("startup", &message);
                return Err(Error::EnumerationFailed(message));
            }
        };

        let items = parse_startup_json(&text).inspect_err(|e| {
            self.sink.error("startup", &e.to_string());
        })?;
        self.sink
            .log("startup", &format!("enumerated {} startup programs", items.len()));
        Ok(items)
    }

    /// Enable or disable the startup program called `name` (case-insensitive)
    ///
    /// The name is only compared, never embedded; the matched entry's
    /// registry name and source are what reach the toggle script.
    pub async fn toggle(&self, name: &str, enable: bool) -> Result<String> {
        let wanted = name.trim();
        let wanted_lower = wanted.to_lowercase();

        let items = self.enumerate().await?;
        let item = items
            .into_iter()
            .find(|item| item.name.to_lowercase() == wanted_lower)
            .ok_or_else(|| {
                self.sink
                    .log("startup", &format!("no startup program named \"{}\"", wanted));
                Error::NotFound(wanted.to_string())
            })?;

        let args = vec![
            ScriptArg::named("-Name", sanitize(&item.registry_name)?),
            ScriptArg::named("-Source", sanitize(&item.source)?),
            ScriptArg::named("-Enable", sanitize(if enable { "1" } else { "0" })?),
        ];
        let request = ExecutionRequest::script(Script::ToggleStartupProgram, args).elevated();
        self.executor.run(request).await?;

        let verb = if enable { "enabled" } else { "disabled" };
        self.sink.log("startup", &format!("{} {}", verb, item.name));
        Ok(format!("Startup program \"{}\" {}.", item.name, verb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_safety() {
        assert_eq!(Safety::parse(Some("danger")).priority(), 3);
        assert_eq!(Safety::parse(Some("Caution")).priority(), 2);
        assert_eq!(Safety::parse(Some("safe")).priority(), 1);
        assert_eq!(Safety::parse(Some("weird")).priority(), 1);
        assert_eq!(Safety::parse(None), Safety::Unknown);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let item = StartupItem::from_raw(RawStartupItem::default(), 4);
        assert_eq!(item.name, "Unnamed");
        assert_eq!(item.registry_name, "Unnamed");
        assert_eq!(item.source, "Unknown");
        assert_eq!(item.command, "Unnamed.exe");
        assert_eq!(item.original_index, 4);
    }

    #[test]
    fn test_blank_command_defaults_to_exe() {
        let raw = RawStartupItem {
            name: Some("Teams".to_string()),
            command: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(StartupItem::from_raw(raw, 0).command, "Teams.exe");
    }

    #[test]
    fn test_parse_accepts_single_object_and_bom() {
        let items = parse_startup_json("\u{feff}{\"Name\":\"OneDrive\",\"Safety\":\"safe\"}").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "OneDrive");
    }

    #[test]
    fn test_parse_empty_output_is_empty_list() {
        assert!(parse_startup_json("  \r\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(matches!(parse_startup_json("not json"), Err(Error::ParseFailed(_))));
        assert!(matches!(parse_startup_json("42"), Err(Error::ParseFailed(_))));
        assert!(matches!(
            parse_startup_json(r#"[{"Name": 5}]"#),
            Err(Error::ParseFailed(_))
        ));
        assert!(matches!(
            parse_startup_json(r#"["Spotify"]"#),
            Err(Error::ParseFailed(_))
        ));
    }

    #[test]
    fn test_sort_is_stable_by_priority_then_index() {
        let json = r#"[
            {"Name":"A","Safety":"danger"},
            {"Name":"B","Safety":"safe"},
            {"Name":"C","Safety":"caution"},
            {"Name":"D"},
            {"Name":"E","Safety":"danger"}
        ]"#;
        let mut items = parse_startup_json(json).unwrap();
        sort_by_priority(&mut items);
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["B", "D", "C", "A", "E"]);
    }
}
