//! Argument parser for the pc-buddy command line
//!
//! Usage: $ pc-buddy [global-options] <command> [command-options]
//!
//! Commands:
//! repair                           Run the system file scan, then deep repair if needed
//! cleanup                          Run disk cleanup
//! startup list [--format <fmt>]    List startup programs (text, json)
//! startup enable <name>            Enable a startup program
//! startup disable <name>           Disable a startup program
//! backup info                      Show backup information
//! backup create [args...]          Create a backup in the resolved location
//! backup path                      Print the resolved backup directory
//!
//! Global options:
//! --verbose, -v                    Debug logging
//! --session-id <uuid>              Session id shown in output blocks
//! --help, -h                       Show usage
//! --version, -V                    Show version

use std::sync::LazyLock;

use regex::Regex;

/// Valid output formats for `startup list`
pub const VALID_OUTPUT_FORMATS: [&str; 2] = ["text", "json"];

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("static regex")
});

/// Check if a string is a valid UUID v4
pub fn is_valid_uuid(s: &str) -> bool {
    UUID_PATTERN.is_match(&s.to_lowercase())
}

/// Generate a UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Result<OutputFormat, String> {
        match value.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Invalid output format: \"{}\". Valid options are: {}",
                other,
                VALID_OUTPUT_FORMATS.join(", ")
            )),
        }
    }
}

/// The operation selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Repair,
    Cleanup,
    StartupList { format: OutputFormat },
    StartupToggle { name: String, enable: bool },
    BackupInfo,
    BackupCreate { args: Vec<String> },
    BackupPath,
    Help,
    Version,
}

impl CliCommand {
    /// Human-readable name shown in output blocks
    pub fn display_name(&self) -> String {
        match self {
            CliCommand::Repair => "repair".to_string(),
            CliCommand::Cleanup => "cleanup".to_string(),
            CliCommand::StartupList { .. } => "startup list".to_string(),
            CliCommand::StartupToggle { name, enable } => format!(
                "startup {} {}",
                if *enable { "enable" } else { "disable" },
                name
            ),
            CliCommand::BackupInfo => "backup info".to_string(),
            CliCommand::BackupCreate { args } if args.is_empty() => "backup create".to_string(),
            CliCommand::BackupCreate { args } => format!("backup create {}", args.join(" ")),
            CliCommand::BackupPath => "backup path".to_string(),
            CliCommand::Help => "help".to_string(),
            CliCommand::Version => "version".to_string(),
        }
    }

    /// Whether the command prints start/finish blocks
    pub fn shows_blocks(&self) -> bool {
        !matches!(
            self,
            CliCommand::Help
                | CliCommand::Version
                | CliCommand::BackupPath
                | CliCommand::StartupList {
                    format: OutputFormat::Json
                }
        )
    }
}

/// Global options parsed from the command line
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Debug logging
    pub verbose: bool,
    /// Session ID (UUID) - auto-generated if not provided
    pub session_id: Option<String>,
}

/// Result of parsing arguments
#[derive(Debug)]
pub struct ParsedArgs {
    pub options: GlobalOptions,
    pub command: CliCommand,
}

/// Parse command line arguments (without the program name)
pub fn parse_args(args: &[String]) -> Result<ParsedArgs, String> {
    let mut options = GlobalOptions::default();

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if !arg.starts_with('-') {
            break;
        }
        match parse_global_option(args, i, &mut options)? {
            Consumed::Options(n) => i += n,
            Consumed::Command(command) => {
                return finish(options, command);
            }
        }
    }

    let rest = &args[i..];
    let command = match rest.first().map(String::as_str) {
        None => CliCommand::Help,
        Some("help") => CliCommand::Help,
        Some("repair") => no_extra_args("repair", &rest[1..], CliCommand::Repair)?,
        Some("cleanup") => no_extra_args("cleanup", &rest[1..], CliCommand::Cleanup)?,
        Some("startup") => parse_startup(&rest[1..])?,
        Some("backup") => parse_backup(&rest[1..])?,
        Some(other) => {
            return Err(format!(
                "Unknown command: \"{}\". Run pc-buddy --help for usage.",
                other
            ))
        }
    };

    finish(options, command)
}

enum Consumed {
    Options(usize),
    Command(CliCommand),
}

fn parse_global_option(
    args: &[String],
    index: usize,
    options: &mut GlobalOptions,
) -> Result<Consumed, String> {
    let arg = &args[index];

    // --help or -h
    if arg == "--help" || arg == "-h" {
        return Ok(Consumed::Command(CliCommand::Help));
    }

    // --version or -V
    if arg == "--version" || arg == "-V" {
        return Ok(Consumed::Command(CliCommand::Version));
    }

    // --verbose or -v
    if arg == "--verbose" || arg == "-v" {
        options.verbose = true;
        return Ok(Consumed::Options(1));
    }

    // --session-id <uuid>
    if arg == "--session-id" {
        if index + 1 < args.len() && !args[index + 1].starts_with('-') {
            options.session_id = Some(args[index + 1].clone());
            return Ok(Consumed::Options(2));
        } else {
            return Err(format!("Option {} requires a UUID argument", arg));
        }
    }

    // --session-id=<value>
    if let Some(value) = arg.strip_prefix("--session-id=") {
        options.session_id = Some(value.to_string());
        return Ok(Consumed::Options(1));
    }

    Err(format!("Unknown option: {}", arg))
}

fn finish(options: GlobalOptions, command: CliCommand) -> Result<ParsedArgs, String> {
    validate_options(&options)?;
    Ok(ParsedArgs { options, command })
}

fn no_extra_args(name: &str, rest: &[String], command: CliCommand) -> Result<CliCommand, String> {
    match rest.first() {
        None => Ok(command),
        Some(extra) => Err(format!(
            "Command {} takes no arguments, got \"{}\"",
            name, extra
        )),
    }
}

fn parse_startup(rest: &[String]) -> Result<CliCommand, String> {
    match rest.first().map(String::as_str) {
        Some("list") => {
            let mut format = OutputFormat::default();
            let mut i = 1;
            while i < rest.len() {
                let arg = &rest[i];
                if arg == "--format" {
                    let value = rest
                        .get(i + 1)
                        .filter(|v| !v.starts_with('-'))
                        .ok_or_else(|| format!("Option {} requires a format argument", arg))?;
                    format = OutputFormat::parse(value)?;
                    i += 2;
                } else if let Some(value) = arg.strip_prefix("--format=") {
                    format = OutputFormat::parse(value)?;
                    i += 1;
                } else {
                    return Err(format!("Unknown option for startup list: {}", arg));
                }
            }
            Ok(CliCommand::StartupList { format })
        }
        Some(action @ ("enable" | "disable")) => {
            // Names may contain spaces; accept them unquoted
            let name = rest[1..].join(" ");
            if name.trim().is_empty() {
                return Err(format!("startup {} requires a program name", action));
            }
            Ok(CliCommand::StartupToggle {
                name,
                enable: action == "enable",
            })
        }
        Some(other) => Err(format!(
            "Unknown startup action: \"{}\". Valid actions are: list, enable, disable",
            other
        )),
        None => Err("startup requires an action: list, enable, disable".to_string()),
    }
}

fn parse_backup(rest: &[String]) -> Result<CliCommand, String> {
    match rest.first().map(String::as_str) {
        Some("info") => no_extra_args("backup info", &rest[1..], CliCommand::BackupInfo),
        Some("path") => no_extra_args("backup path", &rest[1..], CliCommand::BackupPath),
        Some("create") => {
            let args = match rest.get(1).map(String::as_str) {
                Some("--") => rest[2..].to_vec(),
                _ => rest[1..].to_vec(),
            };
            Ok(CliCommand::BackupCreate { args })
        }
        Some(other) => Err(format!(
            "Unknown backup action: \"{}\". Valid actions are: info, create, path",
            other
        )),
        None => Err("backup requires an action: info, create, path".to_string()),
    }
}

/// Validate parsed global options
pub fn validate_options(options: &GlobalOptions) -> Result<(), String> {
    if let Some(ref session_id) = options.session_id {
        if !is_valid_uuid(session_id) {
            return Err(format!(
                "Invalid session ID: \"{}\". Session ID must be a valid UUID v4.",
                session_id
            ));
        }
    }
    Ok(())
}

/// Usage text for --help
pub fn usage() -> &'static str {
    "Usage: pc-buddy [--verbose] [--session-id <uuid>] <command>

Commands:
  repair                         Scan system files, deep repair if needed
  cleanup                        Run disk cleanup
  startup list [--format text|json]
                                 List startup programs, safest first
  startup enable <name>          Enable a startup program
  startup disable <name>         Disable a startup program
  backup info                    Show backup information
  backup create [args...]        Create a backup
  backup path                    Print the backup directory

Options:
  -v, --verbose                  Debug logging
      --session-id <uuid>        Session id for output blocks
  -h, --help                     Show this help
  -V, --version                  Show version"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_arguments_shows_help() {
        let result = parse_args(&[]).unwrap();
        assert_eq!(result.command, CliCommand::Help);
    }

    #[test]
    fn test_parse_repair() {
        let result = parse_args(&args(&["repair"])).unwrap();
        assert_eq!(result.command, CliCommand::Repair);
        assert!(!result.options.verbose);
    }

    #[test]
    fn test_repair_rejects_extra_args() {
        assert!(parse_args(&args(&["repair", "now"])).is_err());
    }

    #[test]
    fn test_verbose_before_command() {
        let result = parse_args(&args(&["-v", "cleanup"])).unwrap();
        assert!(result.options.verbose);
        assert_eq!(result.command, CliCommand::Cleanup);
    }

    #[test]
    fn test_version_short_circuits() {
        let result = parse_args(&args(&["--version", "repair"])).unwrap();
        assert_eq!(result.command, CliCommand::Version);
    }

    #[test]
    fn test_unknown_option_is_error() {
        assert!(parse_args(&args(&["--isolated", "repair"])).is_err());
    }

    #[test]
    fn test_unknown_command_is_error() {
        let err = parse_args(&args(&["defrag"])).unwrap_err();
        assert!(err.contains("defrag"));
    }

    #[test]
    fn test_startup_list_formats() {
        let result = parse_args(&args(&["startup", "list"])).unwrap();
        assert_eq!(
            result.command,
            CliCommand::StartupList {
                format: OutputFormat::Text
            }
        );

        let result = parse_args(&args(&["startup", "list", "--format", "JSON"])).unwrap();
        assert_eq!(
            result.command,
            CliCommand::StartupList {
                format: OutputFormat::Json
            }
        );

        let result = parse_args(&args(&["startup", "list", "--format=json"])).unwrap();
        assert_eq!(
            result.command,
            CliCommand::StartupList {
                format: OutputFormat::Json
            }
        );
    }

    #[test]
    fn test_startup_list_invalid_format() {
        assert!(parse_args(&args(&["startup", "list", "--format", "xml"])).is_err());
        assert!(parse_args(&args(&["startup", "list", "--format"])).is_err());
    }

    #[test]
    fn test_startup_toggle_joins_name() {
        let result = parse_args(&args(&["startup", "disable", "Microsoft", "Teams"])).unwrap();
        assert_eq!(
            result.command,
            CliCommand::StartupToggle {
                name: "Microsoft Teams".to_string(),
                enable: false
            }
        );
    }

    #[test]
    fn test_startup_toggle_requires_name() {
        assert!(parse_args(&args(&["startup", "enable"])).is_err());
        assert!(parse_args(&args(&["startup"])).is_err());
    }

    #[test]
    fn test_backup_create_with_separator() {
        let result = parse_args(&args(&["backup", "create", "--", "-Full"])).unwrap();
        assert_eq!(
            result.command,
            CliCommand::BackupCreate {
                args: vec!["-Full".to_string()]
            }
        );
    }

    #[test]
    fn test_backup_actions() {
        assert_eq!(
            parse_args(&args(&["backup", "info"])).unwrap().command,
            CliCommand::BackupInfo
        );
        assert_eq!(
            parse_args(&args(&["backup", "path"])).unwrap().command,
            CliCommand::BackupPath
        );
        assert!(parse_args(&args(&["backup", "restore"])).is_err());
    }

    #[test]
    fn test_session_id_must_be_uuid() {
        assert!(parse_args(&args(&["--session-id", "not-a-uuid", "repair"])).is_err());
        let id = generate_uuid();
        let result = parse_args(&args(&["--session-id", &id, "repair"])).unwrap();
        assert_eq!(result.options.session_id, Some(id));
    }

    #[test]
    fn test_session_id_equals_syntax() {
        let id = generate_uuid();
        let flag = format!("--session-id={}", id);
        let result = parse_args(&args(&[&flag, "cleanup"])).unwrap();
        assert_eq!(result.options.session_id, Some(id));
    }

    #[test]
    fn test_is_valid_uuid() {
        assert!(is_valid_uuid(&generate_uuid()));
        assert!(!is_valid_uuid("a1b2c3d4-e5f6-7890-abcd-ef1234567890"));
    }

    #[test]
    fn test_display_name() {
        let toggle = CliCommand::StartupToggle {
            name: "Spotify".to_string(),
            enable: true,
        };
        assert_eq!(toggle.display_name(), "startup enable Spotify");
        assert!(toggle.shows_blocks());
        assert!(!CliCommand::StartupList {
            format: OutputFormat::Json
        }
        .shows_blocks());
    }
}
