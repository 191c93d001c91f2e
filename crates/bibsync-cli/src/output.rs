//! Output formatting for human and JSON modes
//!
//! Commands talk to an [`OutputFormatter`]; the sync report and stored
//! library listings are rendered here so `sync` and `watch` print the same
//! thing.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use bibsync_core::domain::VersionCursor;
use bibsync_core::ports::StoredLibrary;
use bibsync_sync::{ChangeCounts, LibraryOutcome, LibraryStatus, SyncReport};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {
        // Human formatter doesn't print JSON
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

/// `collections/items/deleted` cursor triple
pub fn format_cursor(cursor: &VersionCursor) -> String {
    format!("{}/{}/{}", cursor.collections, cursor.items, cursor.deleted)
}

/// `+inserted ~replaced -removed`
pub fn format_counts(counts: &ChangeCounts) -> String {
    format!(
        "+{} ~{} -{}",
        counts.inserted, counts.replaced, counts.removed
    )
}

pub fn format_last_sync(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "Never".to_string(),
    }
}

/// One line per library outcome
pub fn format_outcome(outcome: &LibraryOutcome) -> String {
    let label = format!("{} ({})", outcome.name, outcome.library);
    match &outcome.status {
        LibraryStatus::Synced(summary) => {
            let state = if summary.written {
                "written"
            } else if summary.previous_versions == summary.next_versions {
                "up to date"
            } else {
                "not written"
            };
            format!(
                "{label}: collections {}, items {}, versions {} -> {} [{state}]",
                format_counts(&summary.collections),
                format_counts(&summary.items),
                format_cursor(&summary.previous_versions),
                format_cursor(&summary.next_versions),
            )
        }
        LibraryStatus::Failed { message, .. } => format!("{label}: {message}"),
    }
}

/// Prints a sync report
pub fn print_report(
    report: &SyncReport,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    if format == OutputFormat::Json {
        let json = serde_json::to_value(report).context("Failed to serialize sync report")?;
        formatter.print_json(&json);
        return Ok(());
    }

    let failed = report.failures().count();
    let headline = format!(
        "Synced {} of {} libraries ({} written{}) in {} ms",
        report.libraries.len() - failed,
        report.libraries.len(),
        report.written_count(),
        if report.dry_run { ", dry run" } else { "" },
        report.duration_ms
    );
    if failed == 0 {
        formatter.success(&headline);
    } else {
        formatter.warn(&headline);
    }

    for outcome in &report.libraries {
        if outcome.is_failed() {
            formatter.error(&format_outcome(outcome));
        } else {
            formatter.info(&format_outcome(outcome));
        }
    }

    Ok(())
}

/// Prints stored libraries for `status`
pub fn print_libraries(
    libraries: &[StoredLibrary],
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    if format == OutputFormat::Json {
        let json = serde_json::to_value(libraries).context("Failed to serialize status")?;
        formatter.print_json(&json);
        return Ok(());
    }

    if libraries.is_empty() {
        formatter.info("No libraries synchronized yet. Run 'bibsync sync' first.");
        return Ok(());
    }

    formatter.success(&format!("{} stored libraries", libraries.len()));
    for library in libraries {
        let name = library
            .group_metadata
            .as_ref()
            .map(|m| m.name.as_str())
            .unwrap_or("My Library");
        formatter.info("");
        formatter.info(&format!("{name} ({})", library.library));
        formatter.info(&format!(
            "  Collections: {}  Items: {}",
            library.collection_count, library.item_count
        ));
        formatter.info(&format!("  Versions: {}", format_cursor(&library.versions)));
        formatter.info(&format!(
            "  Last sync: {}",
            format_last_sync(library.last_synced_at)
        ));
    }

    Ok(())
}
