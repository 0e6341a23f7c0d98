//! pc-buddy CLI
//!
//! A command-line tool for Windows maintenance:
//! - System file repair (scan first, deep repair only when needed)
//! - Disk cleanup
//! - Startup program listing and toggling
//! - Backups in the configured (or default) location

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use pc_buddy::{
    args_parser::{generate_uuid, parse_args, usage, CliCommand, OutputFormat},
    create_finish_block, create_start_block, format_startup_items, get_timestamp,
    output_blocks::{FinishBlockOptions, StartBlockOptions},
    run_disk_cleanup, tracing_sink, BackupPathResolver, CommandBuilder, Config, Execute, Executor,
    RepairWorkflow, StartupRegistry,
};

/// Components shared by all commands
struct Services {
    executor: Arc<dyn Execute>,
    repair: RepairWorkflow,
    startup: StartupRegistry,
    backup: BackupPathResolver,
}

impl Services {
    fn new(config: &Config) -> Self {
        let sink = tracing_sink();
        let builder = CommandBuilder::new(&config.scripts);
        let executor: Arc<dyn Execute> = Arc::new(Executor::new(
            config.executor.clone(),
            builder,
            sink.clone(),
        ));

        Self {
            repair: RepairWorkflow::new(executor.clone(), sink.clone()),
            startup: StartupRegistry::new(executor.clone(), &config.startup, sink.clone()),
            backup: BackupPathResolver::new(executor.clone(), &config.backup, sink),
            executor,
        }
    }
}

/// What a command produced
struct Report {
    success: bool,
    /// Printed between the start and finish blocks
    body: Option<String>,
    /// Shown next to the result marker
    summary: String,
}

impl Report {
    fn ok(summary: impl Into<String>) -> Self {
        Self {
            success: true,
            body: None,
            summary: summary.into(),
        }
    }

    fn with_body(body: String, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            body: Some(body),
            summary: summary.into(),
        }
    }

    fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            body: None,
            summary: error.to_string(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let parsed = match parse_args(&args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("{}", usage());
            process::exit(1);
        }
    };

    let config = Config::from_env();
    init_tracing(config.verbose || parsed.options.verbose);

    match parsed.command {
        CliCommand::Help => {
            println!("{}", usage());
            return;
        }
        CliCommand::Version => {
            print_version();
            return;
        }
        _ => {}
    }

    // Generate session ID if not provided
    let session_id = parsed
        .options
        .session_id
        .clone()
        .unwrap_or_else(generate_uuid);

    let services = Services::new(&config);
    let exit_code = run_command(
        &services,
        &parsed.command,
        &session_id,
        config.output_style.as_deref(),
    )
    .await;
    process::exit(exit_code);
}

/// Install the fmt subscriber; `PC_BUDDY_LOG` overrides the level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("PC_BUDDY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_version() {
    let version = env!("CARGO_PKG_VERSION");
    println!("pc-buddy version: {}", version);
    println!();
    println!("OS: {}", std::env::consts::OS);
    println!("Architecture: {}", std::env::consts::ARCH);
}

/// Run one command, printing start/finish blocks where the command has them
async fn run_command(
    services: &Services,
    command: &CliCommand,
    session_id: &str,
    style: Option<&str>,
) -> i32 {
    let show_blocks = command.shows_blocks();
    let start_instant = Instant::now();

    if show_blocks {
        let start_time = get_timestamp();
        let mut extra_lines = Vec::new();
        if requires_elevation(command) {
            extra_lines.push(("elevated", "yes".to_string()));
        }
        println!(
            "{}",
            create_start_block(&StartBlockOptions {
                session_id,
                timestamp: &start_time,
                command: &format!("pc-buddy {}", command.display_name()),
                extra_lines,
                style,
            })
        );
        println!();
    }

    let report = execute(services, command).await;

    if let Some(ref body) = report.body {
        println!("{}", body);
    }

    let exit_code = if report.success { 0 } else { 1 };

    if show_blocks {
        let duration_ms = start_instant.elapsed().as_secs_f64() * 1000.0;
        if report.body.is_some() {
            println!();
        }
        println!(
            "{}",
            create_finish_block(&FinishBlockOptions {
                session_id,
                timestamp: &get_timestamp(),
                exit_code,
                duration_ms: Some(duration_ms),
                result_message: Some(&report.summary),
                style,
            })
        );
    } else if !report.success {
        eprintln!("Error: {}", report.summary);
    }

    exit_code
}

fn requires_elevation(command: &CliCommand) -> bool {
    matches!(
        command,
        CliCommand::Repair
            | CliCommand::Cleanup
            | CliCommand::StartupToggle { .. }
            | CliCommand::BackupCreate { .. }
    )
}

async fn execute(services: &Services, command: &CliCommand) -> Report {
    match command {
        CliCommand::Repair => {
            let outcome = services.repair.run().await;
            Report {
                success: outcome.succeeded(),
                body: None,
                summary: outcome.message,
            }
        }
        CliCommand::Cleanup => match run_disk_cleanup(services.executor.as_ref()).await {
            Ok(message) => Report::ok(message),
            Err(e) => Report::failed(e),
        },
        CliCommand::StartupList { format } => {
            let items = match services.startup.list().await {
                Ok(items) => items,
                Err(e) => return Report::failed(e),
            };
            match format_startup_items(&items, *format) {
                Ok(text) => {
                    let summary = match format {
                        OutputFormat::Text => format!("{} startup programs", items.len()),
                        OutputFormat::Json => String::new(),
                    };
                    Report::with_body(text, summary)
                }
                Err(e) => Report::failed(e),
            }
        }
        CliCommand::StartupToggle { name, enable } => {
            match services.startup.toggle(name, *enable).await {
                Ok(message) => Report::ok(message),
                Err(e) => Report::failed(e),
            }
        }
        CliCommand::BackupInfo => match services.backup.backup_info().await {
            Ok(info) if info.is_empty() => Report::ok("No backup information available."),
            Ok(info) => Report::with_body(info, "Backup information retrieved."),
            Err(e) => Report::failed(e),
        },
        CliCommand::BackupCreate { args } => match services.backup.create_backup(args).await {
            Ok(message) => Report::ok(message),
            Err(e) => Report::failed(e),
        },
        CliCommand::BackupPath => match services.backup.resolve().await {
            Ok(path) => Report::with_body(path.into_string(), String::new()),
            Err(e) => Report::failed(e),
        },
        CliCommand::Help | CliCommand::Version => Report::ok(String::new()),
    }
}
