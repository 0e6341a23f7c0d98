//! Output formatting for CLI start/finish blocks
//!
//! "Status spine" format: every metadata line starts with the spine
//! character followed by a fixed-width label, so output stays readable at
//! any terminal width and is easy to grep.
//!
//! ```text
//! │ session   2f0c...
//! │ start     2025-01-01 10:00:00.000
//! │
//! $ pc-buddy repair
//!
//! ✓ SFC completed successfully. No integrity violations were left unrepaired.
//! │ finish    2025-01-01 10:03:12.481
//! │ duration  192.5s
//! │ exit      0
//! │ session   2f0c...
//! ```
//!
//! Available styles (`PC_BUDDY_OUTPUT_STYLE`):
//! - `unicode` (default): `│`, `✓`, `✗`
//! - `ascii`: `|`, `+`, `x`

use std::env;

/// Spine character for the default style
pub const SPINE: &str = "│";
/// Result marker for a successful operation
pub const SUCCESS_MARKER: &str = "✓";
/// Result marker for a failed operation
pub const FAILURE_MARKER: &str = "✗";

/// Width of the label column, including trailing padding
const LABEL_WIDTH: usize = 10;

/// Characters used to draw blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpineStyle {
    pub spine: &'static str,
    pub success: &'static str,
    pub failure: &'static str,
}

impl SpineStyle {
    pub const UNICODE: SpineStyle = SpineStyle {
        spine: SPINE,
        success: SUCCESS_MARKER,
        failure: FAILURE_MARKER,
    };

    pub const ASCII: SpineStyle = SpineStyle {
        spine: "|",
        success: "+",
        failure: "x",
    };
}

/// Get the style from an explicit name, `PC_BUDDY_OUTPUT_STYLE`, or the default
pub fn get_spine_style(style_name: Option<&str>) -> SpineStyle {
    let env_style = env::var("PC_BUDDY_OUTPUT_STYLE").ok();
    let name = style_name.or(env_style.as_deref()).unwrap_or("unicode");

    match name {
        "ascii" => SpineStyle::ASCII,
        _ => SpineStyle::UNICODE,
    }
}

/// `│ label     value`
pub fn create_spine_line(label: &str, value: &str, style: &SpineStyle) -> String {
    format!("{} {:<width$}{}", style.spine, label, value, width = LABEL_WIDTH)
}

pub fn create_empty_spine_line(style: &SpineStyle) -> String {
    style.spine.to_string()
}

/// `$ command`
pub fn create_command_line(command: &str) -> String {
    format!("$ {}", command)
}

pub fn get_result_marker(success: bool, style: &SpineStyle) -> &'static str {
    if success {
        style.success
    } else {
        style.failure
    }
}

/// Current local time for block timestamps
pub fn get_timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

/// Format duration in seconds with appropriate precision
pub fn format_duration(duration_ms: f64) -> String {
    let seconds = duration_ms / 1000.0;
    if seconds < 0.001 {
        "0.001s".to_string()
    } else if seconds < 10.0 {
        format!("{:.3}s", seconds)
    } else if seconds < 100.0 {
        format!("{:.2}s", seconds)
    } else {
        format!("{:.1}s", seconds)
    }
}

/// Options for creating a start block
pub struct StartBlockOptions<'a> {
    pub session_id: &'a str,
    pub timestamp: &'a str,
    pub command: &'a str,
    /// Additional label/value lines (e.g. `elevated yes`)
    pub extra_lines: Vec<(&'a str, String)>,
    pub style: Option<&'a str>,
}

/// Create a start block for an operation
pub fn create_start_block(options: &StartBlockOptions) -> String {
    let style = get_spine_style(options.style);

    let mut lines = vec![
        create_spine_line("session", options.session_id, &style),
        create_spine_line("start", options.timestamp, &style),
    ];
    for (label, value) in &options.extra_lines {
        lines.push(create_spine_line(label, value, &style));
    }
    lines.push(create_empty_spine_line(&style));
    lines.push(create_command_line(options.command));

    lines.join("\n")
}

/// Options for creating a finish block
pub struct FinishBlockOptions<'a> {
    pub session_id: &'a str,
    pub timestamp: &'a str,
    pub exit_code: i32,
    pub duration_ms: Option<f64>,
    /// Shown next to the result marker
    pub result_message: Option<&'a str>,
    pub style: Option<&'a str>,
}

/// Create a finish block for an operation
///
/// The session line is always last so the block can be matched back to its
/// start block.
pub fn create_finish_block(options: &FinishBlockOptions) -> String {
    let style = get_spine_style(options.style);
    let marker = get_result_marker(options.exit_code == 0, &style);

    let mut lines = vec![match options.result_message {
        Some(message) if !message.is_empty() => format!("{} {}", marker, message),
        _ => marker.to_string(),
    }];

    lines.push(create_spine_line("finish", options.timestamp, &style));
    if let Some(duration_ms) = options.duration_ms {
        lines.push(create_spine_line(
            "duration",
            &format_duration(duration_ms),
            &style,
        ));
    }
    lines.push(create_spine_line(
        "exit",
        &options.exit_code.to_string(),
        &style,
    ));
    lines.push(create_spine_line("session", options.session_id, &style));

    lines.join("\n")
}
