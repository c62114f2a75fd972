//! Terminal output for the command-line tool
//!
//! Spinner during populate and the human-readable status report.

use crate::queue::PopulateSummary;
use crate::status::WorkspaceStatus;
use console::{style, Term};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Spinner shown while a long step runs
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create and start a spinner
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        let template = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header before populating
pub fn print_header(workspace: &Path, source: &str, group_size: usize) {
    println!();
    println!(
        "{} {}",
        style("fs-workqueue").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Workspace:").bold(), workspace.display());
    println!("  {} {}", style("Input:").bold(), source);
    println!("  {} {}", style("Group size:").bold(), group_size);
    println!();
}

/// Print the outcome of a populate run
pub fn print_populate_summary(
    summary: &PopulateSummary,
    excluded: usize,
    duration: Duration,
    index_size: Option<u64>,
) {
    println!();
    println!("{}", style("Populate Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Paths read:").bold(),
        format_number(summary.total_paths as u64)
    );
    if excluded > 0 {
        println!(
            "  {} {}",
            style("Excluded:").bold(),
            format_number(excluded as u64)
        );
    }
    println!(
        "  {} {}",
        style("New paths:").bold(),
        format_number(summary.new_paths as u64)
    );
    println!(
        "  {} {}",
        style("New groups:").bold(),
        format_number(summary.new_groups as u64)
    );
    if summary.collisions > 0 {
        println!(
            "  {} {}",
            style("Identity collisions:").yellow().bold(),
            summary.collisions
        );
    }
    println!(
        "  {} {:.1}s",
        style("Duration:").bold(),
        duration.as_secs_f64()
    );
    if let Some(size) = index_size {
        println!("  {} {}", style("Index size:").bold(), format_size(size, BINARY));
    }
    println!();
}

/// Print a workspace status report
pub fn print_status(status: &WorkspaceStatus, clear: bool) {
    if clear {
        let _ = Term::stdout().clear_screen();
    }

    println!("{}", style("fs-workqueue Status").cyan().bold());
    println!("{}", "=".repeat(50));
    println!("  {}", style(status.root.display()).dim());
    println!();

    let health_style = match status.health.as_str() {
        "complete" => style(&status.health).green(),
        "active" => style(&status.health).cyan(),
        "idle" => style(&status.health).dim(),
        "pending" => style(&status.health).yellow(),
        _ => style(&status.health).red(),
    };
    println!("Health: {}", health_style.bold());
    println!();

    println!("{}", style("Index").yellow().bold());
    println!("  Groups:     {}", style(format_number(status.groups as u64)).cyan());
    println!("  Paths:      {}", style(format_number(status.paths as u64)).cyan());
    if let Some(size) = status.index_bytes {
        println!("  Size:       {}", style(format_size(size, BINARY)).dim());
    }
    println!();

    println!("{}", style("Progress").yellow().bold());
    println!(
        "  Completed:  {} ({:.1}%)",
        style(format_number(status.completed as u64)).green(),
        status.percent_complete()
    );
    println!("  Remaining:  {}", style(format_number(status.remaining as u64)).cyan());
    println!();

    println!("{}", style("Leases").yellow().bold());
    if status.leases.is_empty() {
        println!("  {}", style("No leases held").dim());
    } else {
        let stale = if status.stale_leases > 0 {
            style(status.stale_leases).red()
        } else {
            style(status.stale_leases).dim()
        };
        println!("  Active: {}  Stale: {}", style(status.active_leases).green(), stale);
        for lease in &status.leases {
            let icon = if lease.is_stale {
                style("○").red()
            } else {
                style("●").green()
            };
            println!(
                "  {} {} (held for {}s)",
                icon,
                lease.hash.chars().take(12).collect::<String>(),
                lease.age_secs
            );
        }
    }
    println!();

    if !status.messages.is_empty() {
        println!("{}", style("Messages").yellow().bold());
        for msg in &status.messages {
            println!("  {} {}", style("!").yellow(), msg);
        }
        println!();
    }

    println!(
        "Last updated: {}",
        style(status.timestamp.format("%Y-%m-%d %H:%M:%S UTC")).dim()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}
