use std::fmt::Display;
use std::path::Path;

use colored::*;
use unicode_width::UnicodeWidthStr;

use sixkit_common::model::AddressSet;

pub const TOTAL_WIDTH: usize = 64;

fn print(msg: &str) {
    tracing::info!(target: "sixkit::print", "{msg}");
}

pub fn banner(q_level: u8) {
    if q_level > 0 {
        return;
    }

    let text_content: String = format!("⟦ SIXKIT v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let text_width: usize = UnicodeWidthStr::width(text_content.as_str());
    let text: ColoredString = text_content.bright_green().bold();
    let sep: ColoredString = "═"
        .repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2)
        .bright_black();

    print(&format!("{}{}{}", sep, text, sep));
}

pub fn header(msg: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }

    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{}", line));
}

pub fn aligned_line<V: Display>(key: &str, value: V) {
    let dots: String = ".".repeat(24usize.saturating_sub(key.len()));
    print(&format!(
        "{} {}{} {}",
        ">".bright_black(),
        key.cyan(),
        dots.bright_black(),
        value
    ));
}

/// Addresses go to the output file when given, otherwise to stdout one
/// per line, so stdout stays clean for piping regardless of log level.
pub fn emit_addresses(set: &AddressSet, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let mut contents = set.addresses.join("\n");
            contents.push('\n');
            std::fs::write(path, contents)?;
            tracing::info!(
                "wrote {} addresses to {}",
                set.len(),
                path.display()
            );
        }
        None => {
            for addr in &set.addresses {
                println!("{addr}");
            }
        }
    }
    Ok(())
}

/// JSON outputs (model handles, scan results, reports) follow the same
/// file-or-stdout rule.
pub fn emit_json<T: serde::Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            tracing::info!("wrote result to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
