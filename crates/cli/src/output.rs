//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde_json::Value;

use vbook_common::TestResponse;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Plain,
    /// Table of every response field
    Table,
    /// JSON format
    Json,
}

/// Print the answer of a test run
pub fn print_test_response(response: &TestResponse, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print!("{}", render_plain(response)),
        OutputFormat::Table => println!("{}", render_table(response)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&response.to_wire_json()).unwrap_or_default()
        ),
    }
}

fn render_plain(response: &TestResponse) -> String {
    let mut out = String::new();
    let status = if response.is_success() {
        response.status.green().bold()
    } else {
        response.status.red().bold()
    };
    out.push_str(&format!("Status: {}\n", status));

    if !response.output.is_empty() {
        out.push_str(&format!("{}\n{}\n", "Output:".bold(), response.output));
    }
    if !response.error.is_empty() {
        out.push_str(&format!("{}\n{}\n", "Error:".red().bold(), response.error));
    }

    let mut details = response
        .extra_details()
        .filter(|(_, value)| !is_blank(value))
        .peekable();
    if details.peek().is_some() {
        out.push_str(&format!("{}\n", "Details:".bold()));
        for (key, value) in details {
            out.push_str(&format!("  {}: {}\n", key, display_value(value)));
        }
    }
    out
}

fn render_table(response: &TestResponse) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["status", response.status.as_str()]);
    table.add_row(vec!["output", response.output.as_str()]);
    table.add_row(vec!["error", response.error.as_str()]);
    for (key, value) in response.extra_details() {
        table.add_row(vec![key.clone(), display_value(value)]);
    }
    table
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Strings unquoted, anything else as compact JSON
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message.red());
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message.yellow());
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_with_details() -> TestResponse {
        let mut response = TestResponse::success("chapter list");
        response.details = json!({
            "status": "success",
            "output": "chapter list",
            "time": 12,
            "log": "fetched 3 pages",
            "trace": ""
        })
        .as_object()
        .cloned();
        response
    }

    #[test]
    fn test_plain_lists_extra_details_only() {
        colored::control::set_override(false);
        let text = render_plain(&response_with_details());
        assert!(text.starts_with("Status: success\n"));
        assert!(text.contains("Output:\nchapter list\n"));
        assert!(text.contains("  time: 12\n"));
        assert!(text.contains("  log: fetched 3 pages\n"));
        assert!(!text.contains("  status:"));
        assert!(!text.contains("trace"));
        assert!(!text.contains("Error:"));
    }

    #[test]
    fn test_plain_error_response() {
        colored::control::set_override(false);
        let text = render_plain(&TestResponse::error("No response received"));
        assert!(text.contains("Status: error"));
        assert!(text.contains("Error:\nNo response received"));
        assert!(!text.contains("Details:"));
    }

    #[test]
    fn test_table_has_detail_rows() {
        let table = render_table(&response_with_details()).to_string();
        assert!(table.contains("fetched 3 pages"));
        assert!(table.contains("time"));
    }
}
