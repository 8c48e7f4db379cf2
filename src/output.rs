//! Output formatting and styling module.
//!
//! Run summaries printed at the end of the CLI. Per-file events go through
//! the `log` facade instead, so they obey `--verbose`.

use crate::linker::{LinkReport, PruneReport};
use colored::*;

/// Prints styled messages and run summaries.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use plex_linker::output::OutputFormatter;
    /// OutputFormatter::error("Source path [/srv/tv] not found.");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints a table of classified files per format, followed by link counts.
    pub fn link_summary(report: &LinkReport, dry_run: bool) {
        Self::header("LINKS");

        let rows: Vec<(&str, usize)> = report
            .per_format
            .iter()
            .map(|(format, count)| (format.label(), *count))
            .collect();
        let width = rows
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0)
            .max(6); // At least "Format" width

        println!("{:<width$} | {}", "Format".bold(), "Files".bold(), width = width);
        println!("{}", "-".repeat(width + 10));
        for (label, count) in &rows {
            println!(
                "{:<width$} | {} {}",
                label,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            report.total_classified().to_string().green().bold(),
            plural(report.total_classified()),
            width = width
        );

        println!();
        if dry_run {
            Self::dry_run_notice(&link_count_line(report, dry_run));
        } else {
            Self::success(&link_count_line(report, dry_run));
        }
        println!("  Already present: {}", report.already_present);
        if report.filtered > 0 {
            println!("  Filtered out: {}", report.filtered);
        }
    }

    /// Prints what a pruning pass removed.
    pub fn prune_summary(report: &PruneReport, dry_run: bool) {
        Self::header("BROKEN LINKS");

        if dry_run {
            Self::dry_run_notice(&format!(
                "{} would be removed",
                count_links(report.removed.len())
            ));
        } else {
            Self::success(&format!("{} removed", count_links(report.removed.len())));
        }
        println!("  Intact: {}", report.intact);
        if !report.pruned_dirs.is_empty() {
            println!("  Empty directories removed: {}", report.pruned_dirs.len());
        }
        if !report.ignored_files.is_empty() {
            Self::warning(&format!(
                "{} in the destination {} not a symlink and {} left alone",
                report.ignored_files.len(),
                if report.ignored_files.len() == 1 {
                    "entry is"
                } else {
                    "entries are"
                },
                if report.ignored_files.len() == 1 {
                    "was"
                } else {
                    "were"
                },
            ));
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

fn link_count_line(report: &LinkReport, dry_run: bool) -> String {
    if dry_run {
        format!("{} would be created", count_links(report.planned.len()))
    } else {
        format!("{} created", count_links(report.created.len()))
    }
}

fn count_links(count: usize) -> String {
    format!("{} {}", count, if count == 1 { "link" } else { "links" })
}
