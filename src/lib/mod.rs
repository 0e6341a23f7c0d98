//! pc-buddy library
//!
//! Privileged execution layer for Windows maintenance: system file repair,
//! disk cleanup, startup program management and backups. Everything that
//! leaves the process goes through the validator, the command builder and
//! the executor.

pub mod admission;
pub mod args_parser;
pub mod backup;
pub mod cleanup;
pub mod command_builder;
pub mod config;
pub mod elevation;
pub mod error;
pub mod executor;
pub mod log_sink;
pub mod output_blocks;
pub mod repair;
pub mod startup;
pub mod status_formatter;
pub mod validator;

// Re-export commonly used items
pub use admission::{Admission, AdmissionGate};
pub use args_parser::{
    generate_uuid, is_valid_uuid, parse_args, usage, validate_options, CliCommand, GlobalOptions,
    OutputFormat, ParsedArgs, VALID_OUTPUT_FORMATS,
};
pub use backup::{
    default_backup_path, parse_registry_value, BackupPathResolution, BackupPathResolver,
    BackupPathSource, BackupScript,
};
pub use cleanup::{run_disk_cleanup, MSG_CLEANUP_DONE};
pub use command_builder::{
    CommandBuilder, InlineCommand, RegistryQuery, Script, ScriptArg, POWERSHELL_PREFIX,
};
pub use config::{BackupConfig, Config, ExecutorConfig, ScriptConfig, StartupConfig};
pub use error::{Error, FailureCause, Result};
pub use executor::{
    decode_output, get_shell, Execute, ExecutionOutput, ExecutionRequest, Executor, Target,
};
pub use log_sink::{tracing_sink, LogSink, NullSink, TracingSink};
pub use output_blocks::{
    create_command_line, create_empty_spine_line, create_finish_block, create_spine_line,
    create_start_block, format_duration, get_result_marker, get_spine_style, get_timestamp,
    FinishBlockOptions, SpineStyle, StartBlockOptions, FAILURE_MARKER, SPINE, SUCCESS_MARKER,
};
pub use repair::{
    needs_deep_repair, RepairEvent, RepairOutcome, RepairState, RepairWorkflow, MSG_CLEAN,
    MSG_DEEP_REPAIR_DONE, MSG_DEEP_REPAIR_FAILED, MSG_SCAN_FAILED,
};
pub use startup::{
    parse_startup_json, sort_by_priority, RawStartupItem, Safety, StartupItem, StartupRegistry,
};
pub use status_formatter::{format_startup_items, format_startup_items_as_text};
pub use validator::{sanitize, validate_path, SanitizedString, ValidatedPath};
