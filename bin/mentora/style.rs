//! Terminal output helpers

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use console::style;

use mentora_client::MessageKind;

pub fn print_success(msg: &str) {
    println!("  {} {}", style("✓").green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("  {} {}", style("✗").red(), style(msg).red());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", style("⚠").yellow(), style(msg).yellow());
}

pub fn print_info(msg: &str) {
    println!("  {} {}", style("ℹ").blue(), msg);
}

pub fn print_header(title: &str) {
    println!();
    println!("  {}", style(title).cyan().bold());
    println!("  {}", style("─".repeat(title.chars().count().max(40))).dim());
}

pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<16} {}", style(label).dim(), value);
}

pub fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Print one agent message, coloured by kind
pub fn print_agent_message(kind: &MessageKind, heading: Option<&str>, content: &str) {
    let tag = match kind {
        MessageKind::Agent => style("agent").magenta(),
        MessageKind::Response => style("response").green(),
        MessageKind::Info => style("info").blue(),
        MessageKind::Util => style("util").dim(),
        MessageKind::Error => style("error").red(),
        MessageKind::User => style("you").cyan(),
        MessageKind::CodeExe => style("code").yellow(),
        MessageKind::Other(other) => style(other.as_str()).dim(),
    };
    match heading {
        Some(h) if !h.is_empty() => println!("  [{}] {}", tag, style(h).bold()),
        _ => println!("  [{}]", tag),
    }
    for line in content.lines() {
        println!("    {line}");
    }
}
