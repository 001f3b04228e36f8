//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use sitegate_e2e::StatusSummary;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

/// Render a status summary as a one-column table
pub fn status_table(summary: &StatusSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![summary.title.clone()]);
    table.add_row(vec![summary.summary.clone()]);
    for line in summary.text.lines() {
        table.add_row(vec![line.to_string()]);
    }
    table
}

/// Print a status summary
pub fn print_status(summary: &StatusSummary, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{}", status_table(summary)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary).unwrap_or_default());
        }
        OutputFormat::Plain => {
            println!("{}: {}", summary.title, summary.summary);
            println!("{}", summary.text);
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message.red());
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("⚠️  {}", message.yellow());
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}

/// Print the underlying cause below a failure line
pub fn print_detail(detail: &str) {
    eprintln!("   {}", detail.dimmed());
}
