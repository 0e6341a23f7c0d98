//! Tests for output_blocks module
//!
//! Tests for the "status spine" format: width-independent, lossless output.

use pc_buddy::{
    create_command_line, create_finish_block, create_spine_line, create_start_block,
    format_duration, get_result_marker, get_spine_style, FinishBlockOptions, SpineStyle,
    StartBlockOptions, FAILURE_MARKER, SPINE, SUCCESS_MARKER,
};

#[test]
fn test_spine_constants() {
    assert_eq!(SPINE, "│");
    assert_eq!(SUCCESS_MARKER, "✓");
    assert_eq!(FAILURE_MARKER, "✗");
}

#[test]
fn test_get_result_marker() {
    let style = SpineStyle::UNICODE;
    assert_eq!(get_result_marker(true, &style), "✓");
    assert_eq!(get_result_marker(false, &style), "✗");
    assert_eq!(get_result_marker(false, &SpineStyle::ASCII), "x");
}

#[test]
fn test_explicit_style_wins() {
    assert_eq!(get_spine_style(Some("ascii")), SpineStyle::ASCII);
    assert_eq!(get_spine_style(Some("unicode")), SpineStyle::UNICODE);
    assert_eq!(get_spine_style(Some("whatever")), SpineStyle::UNICODE);
}

#[test]
fn test_spine_line_pads_label() {
    let style = SpineStyle::UNICODE;
    assert_eq!(create_spine_line("exit", "0", &style), "│ exit      0");
    assert_eq!(create_command_line("pc-buddy repair"), "$ pc-buddy repair");
}

#[test]
fn test_create_start_block() {
    let block = create_start_block(&StartBlockOptions {
        session_id: "test-uuid",
        timestamp: "2025-01-01 00:00:00",
        command: "pc-buddy repair",
        extra_lines: vec![("elevated", "yes".to_string())],
        style: Some("unicode"),
    });

    assert!(block.contains("│ session   test-uuid"));
    assert!(block.contains("│ start     2025-01-01 00:00:00"));
    assert!(block.contains("│ elevated  yes"));
    assert!(block.ends_with("$ pc-buddy repair"));
}

#[test]
fn test_create_finish_block() {
    let block = create_finish_block(&FinishBlockOptions {
        session_id: "test-uuid",
        timestamp: "2025-01-01 00:00:01",
        exit_code: 0,
        duration_ms: Some(17.0),
        result_message: Some("Disk cleanup completed."),
        style: Some("unicode"),
    });

    assert!(block.starts_with("✓ Disk cleanup completed."));
    assert!(block.contains("│ finish    2025-01-01 00:00:01"));
    assert!(block.contains("│ duration  0.017s"));
    assert!(block.contains("│ exit      0"));
    assert!(block.contains("│ session   test-uuid"));
}

#[test]
fn test_create_finish_block_failure() {
    let block = create_finish_block(&FinishBlockOptions {
        session_id: "test-uuid",
        timestamp: "2025-01-01 00:00:01",
        exit_code: 1,
        duration_ms: Some(100.0),
        result_message: None,
        style: Some("unicode"),
    });

    assert_eq!(block.lines().next(), Some("✗"));
    assert!(block.contains("│ exit      1"));
}

#[test]
fn test_create_finish_block_without_duration() {
    let block = create_finish_block(&FinishBlockOptions {
        session_id: "test-uuid",
        timestamp: "2025-01-01 00:00:01",
        exit_code: 0,
        duration_ms: None,
        result_message: None,
        style: Some("unicode"),
    });

    assert!(block.contains("│ finish    2025-01-01 00:00:01"));
    assert!(!block.contains("duration"));
}

#[test]
fn test_finish_block_session_last() {
    let block = create_finish_block(&FinishBlockOptions {
        session_id: "test-uuid",
        timestamp: "2025-01-01 00:00:01",
        exit_code: 0,
        duration_ms: Some(17.0),
        result_message: Some("done"),
        style: Some("ascii"),
    });

    let lines: Vec<&str> = block.lines().collect();
    assert_eq!(lines[0], "+ done");
    assert_eq!(lines[lines.len() - 1], "| session   test-uuid");
    assert_eq!(lines[lines.len() - 2], "| exit      0");
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(0.5), "0.001s");
    assert_eq!(format_duration(17.0), "0.017s");
    assert_eq!(format_duration(500.0), "0.500s");
    assert_eq!(format_duration(1000.0), "1.000s");
    assert_eq!(format_duration(5678.0), "5.678s");
    assert_eq!(format_duration(12340.0), "12.34s");
    assert_eq!(format_duration(123456.0), "123.5s");
}
