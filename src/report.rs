//! Converts a finished [`ScopeStats`] into a [`CoverageReport`].

use std::collections::HashSet;

use crate::model::{percentage, CoverageReport, ReportLevel};
use crate::stats::{FunctionKey, ScopeStats};

/// Build the report record for one scope.
///
/// The uncovered listings are populated only for file-level reports with
/// a positive corresponding percentage; a 0%-covered file would list
/// everything, which is redundant and potentially huge.
#[must_use]
pub fn build_report(path: &str, stats: &ScopeStats, level: ReportLevel) -> CoverageReport {
    // The directory scope for bare filenames has an empty path; report
    // it as the root sentinel.
    let full_path = if level == ReportLevel::Directory && path.is_empty() {
        "."
    } else {
        path
    };

    let line_coverage = percentage(stats.lines_covered, stats.lines_total);
    let function_coverage = percentage(stats.functions_covered, stats.functions_total);
    let branch_coverage = percentage(stats.branches_covered, stats.branches_total);

    let is_file = level == ReportLevel::File;
    let uncovered_lines = if is_file && line_coverage > 0.0 {
        format_uncovered_lines(&stats.uncovered_lines)
    } else {
        String::new()
    };
    let uncovered_functions = if is_file && function_coverage > 0.0 {
        format_uncovered_functions(&stats.uncovered_functions)
    } else {
        String::new()
    };
    let uncovered_branches = if is_file && branch_coverage > 0.0 {
        format_uncovered_branches(&stats.uncovered_branches)
    } else {
        String::new()
    };

    CoverageReport {
        package_name: None,
        level,
        full_path: full_path.to_string(),
        statement_coverage: line_coverage,
        function_coverage,
        branch_coverage,
        line_coverage,
        uncovered_lines,
        uncovered_functions,
        uncovered_branches,
    }
}

/// Ascending line numbers, comma-joined.
fn format_uncovered_lines(lines: &HashSet<u32>) -> String {
    let mut sorted: Vec<u32> = lines.iter().copied().collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Functions ordered by first numeric field (name as tiebreaker),
/// rendered as `L{line}:{name}` or `L{start}-{end}:{name}`.
fn format_uncovered_functions(functions: &HashSet<FunctionKey>) -> String {
    let mut sorted: Vec<&FunctionKey> = functions.iter().collect();
    sorted.sort_by_key(|f| (f.start_line(), f.name().to_string()));
    sorted
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Canonical descriptors in lexicographic order, comma-joined.
fn format_uncovered_branches(branches: &HashSet<String>) -> String {
    let mut sorted: Vec<&str> = branches.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(", ")
}
