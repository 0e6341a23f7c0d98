//! Formatting for startup program listings
//!
//! - JSON: the normalized items, pretty-printed
//! - Text: human-readable list, in the order given

use crate::args_parser::OutputFormat;
use crate::startup::StartupItem;

/// Format startup items as human-readable text
pub fn format_startup_items_as_text(items: &[StartupItem]) -> String {
    if items.is_empty() {
        return "No startup programs found.".to_string();
    }

    let mut lines = vec![
        format!("Startup Programs ({})", items.len()),
        "=".repeat(50),
    ];

    for (position, item) in items.iter().enumerate() {
        lines.push(format!(
            "{:>2}. {} [{}]",
            position + 1,
            item.name,
            safety_label(item)
        ));
        if item.registry_name != item.name {
            lines.push(format!("    Entry:   {}", item.registry_name));
        }
        lines.push(format!("    Source:  {}", item.source));
        lines.push(format!("    Command: {}", item.command));
    }

    lines.join("\n")
}

fn safety_label(item: &StartupItem) -> &'static str {
    use crate::startup::Safety;

    match item.safety {
        Safety::Safe => "safe",
        Safety::Caution => "caution",
        Safety::Danger => "danger",
        Safety::Unknown => "unknown",
    }
}

/// Format startup items based on format type
pub fn format_startup_items(items: &[StartupItem], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(items)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Text => Ok(format_startup_items_as_text(items)),
    }
}
