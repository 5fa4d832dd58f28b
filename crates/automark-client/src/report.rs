//! Plain-text progress table.

use std::fmt::Write;

use automark_core::ProgressReport;

const RULE_WIDTH: usize = 45;

/// Render `report` as a fixed-width table: name and mail, then one row per
/// assignment.
pub fn format_progress(report: &ProgressReport) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "| {:42}|", report.name);
    let _ = writeln!(out, "| {:42}|", report.mail);
    let _ = writeln!(out, "{}", rule);
    for (assignment, state) in &report.progress {
        let _ = writeln!(out, "| {:25}| {:15}|", assignment, state.as_str());
    }
    let _ = writeln!(out, "{}", rule);
    out
}
