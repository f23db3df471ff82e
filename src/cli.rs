//! Command handler functions for the covagg CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;

use anyhow::Result;
use clap::ValueEnum;

use crate::model::{CoverageReport, ReportLevel};
use crate::parser::parse_coverage;

/// Output style for the `report` command.
#[derive(Clone, ValueEnum)]
pub enum Style {
    Text,
    Markdown,
    Json,
}

/// Parse a report and render every file, directory, and repository record.
pub fn cmd_report(input: &str, style: &Style) -> Result<String> {
    let reports = parse_coverage(input);

    let output = match style {
        Style::Text => format_text(&reports),
        Style::Markdown => format_markdown(&reports),
        Style::Json => {
            let mut json = serde_json::to_string_pretty(&reports)?;
            json.push('\n');
            json
        }
    };

    Ok(output)
}

/// Parse a report and render only the repository-level rollup.
pub fn cmd_summary(input: &str) -> Result<String> {
    let reports = parse_coverage(input);
    let Some(repo) = reports.last() else {
        anyhow::bail!("coverage parse produced no reports");
    };

    let mut out = String::new();
    writeln!(out, "Lines:       {:.2}%", repo.line_coverage).unwrap();
    writeln!(out, "Statements:  {:.2}%", repo.statement_coverage).unwrap();
    writeln!(out, "Functions:   {:.2}%", repo.function_coverage).unwrap();
    writeln!(out, "Branches:    {:.2}%", repo.branch_coverage).unwrap();
    Ok(out)
}

fn format_text(reports: &[CoverageReport]) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{:<50} {:<11} {:>9} {:>9} {:>9}",
        "PATH", "LEVEL", "LINES", "FUNCS", "BRANCHES"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(92)).unwrap();

    for r in reports {
        writeln!(
            out,
            "{:<50} {:<11} {:>8.2}% {:>8.2}% {:>8.2}%",
            r.full_path, r.level, r.line_coverage, r.function_coverage, r.branch_coverage
        )
        .unwrap();
    }

    out
}

fn format_markdown(reports: &[CoverageReport]) -> String {
    let mut md = String::new();

    let overall = reports
        .iter()
        .find(|r| r.level == ReportLevel::Repository)
        .map_or(100.0, |r| r.line_coverage);
    writeln!(md, "### Coverage: {overall:.2}%\n").unwrap();

    md.push_str("| Path | Level | Lines | Functions | Branches |\n");
    md.push_str("|:-----|:------|------:|----------:|---------:|\n");
    for r in reports {
        writeln!(
            md,
            "| `{}` | {} | {:.2}% | {:.2}% | {:.2}% |",
            r.full_path, r.level, r.line_coverage, r.function_coverage, r.branch_coverage
        )
        .unwrap();
    }

    let with_listings: Vec<&CoverageReport> = reports
        .iter()
        .filter(|r| {
            !r.uncovered_lines.is_empty()
                || !r.uncovered_functions.is_empty()
                || !r.uncovered_branches.is_empty()
        })
        .collect();

    if !with_listings.is_empty() {
        md.push_str("\n<details>\n<summary>Uncovered</summary>\n\n");
        for r in &with_listings {
            writeln!(md, "**`{}`**", r.full_path).unwrap();
            if !r.uncovered_lines.is_empty() {
                writeln!(md, "- lines: {}", r.uncovered_lines).unwrap();
            }
            if !r.uncovered_functions.is_empty() {
                writeln!(md, "- functions: {}", r.uncovered_functions).unwrap();
            }
            if !r.uncovered_branches.is_empty() {
                writeln!(md, "- branches: {}", r.uncovered_branches).unwrap();
            }
            md.push('\n');
        }
        md.push_str("</details>\n");
    }

    md
}
