//! Output model for aggregated coverage. The parser produces one
//! [`CoverageReport`] per file, one per directory, and a single
//! repository-wide record.

use serde::Serialize;

/// Aggregation level of a [`CoverageReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    File,
    Directory,
    Repository,
}

impl std::fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReportLevel::File => "file",
            ReportLevel::Directory => "directory",
            ReportLevel::Repository => "repository",
        };
        f.write_str(s)
    }
}

/// Compute a coverage percentage rounded to two decimal places.
///
/// A scope with zero countable units is vacuously fully covered, so a
/// zero total yields 100.0 rather than NaN. The convention applies
/// independently per metric.
#[must_use]
pub fn percentage(covered: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        (covered as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
    }
}

/// One aggregated coverage record for a file, directory, or the whole
/// repository.
///
/// The three `uncovered_*` fields are human-readable listings. They are
/// populated only for file-level reports whose corresponding percentage
/// is above zero; a 0%-covered file would list every line, which is
/// redundant and potentially huge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Package name, reserved for package-aware formats. Always `None`
    /// for the LCOV-like grammar.
    pub package_name: Option<String>,
    pub level: ReportLevel,
    pub full_path: String,
    /// Identical to `line_coverage`; the grammar has no distinct
    /// statement record.
    pub statement_coverage: f64,
    pub function_coverage: f64,
    pub branch_coverage: f64,
    pub line_coverage: f64,
    pub uncovered_lines: String,
    pub uncovered_functions: String,
    pub uncovered_branches: String,
}
