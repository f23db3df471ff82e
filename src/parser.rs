//! Tokenizer/dispatcher and scan orchestrator for the LCOV-like report
//! grammar.
//!
//! Reference: https://ltp.sourceforge.net/coverage/lcov/geninfo.1.php
//!
//! Key records:
//!   TN:<test name>
//!   SF:<path to source file>
//!   FN:<line>,<name>                  (Jest/Vitest, Flutter)
//!   FN:<start line>,<end line>,<name> (coverage.py)
//!   FNDA:<execution count>,<name>
//!   FNF:<functions found>
//!   FNH:<functions hit>
//!   DA:<line number>,<execution count>
//!   BRDA:<line>,<block>,<descriptor>,<taken>   ("-" means not executed)
//!   BRF:<branches found>
//!   BRH:<branches hit>
//!   LF:<lines found>
//!   LH:<lines hit>
//!   end_of_record
//!
//! The scan runs once over the input, left to right, with a single
//! "current file" cursor. Each `end_of_record` rolls the finished file
//! scope up into its directory and the repository scope. Malformed
//! records are skipped with a warning; they never abort the scan.

use std::io::BufRead;

use indexmap::IndexMap;

use crate::branch;
use crate::error::{CovaggError, Result};
use crate::model::{CoverageReport, ReportLevel};
use crate::report::build_report;
use crate::stats::{FunctionKey, ScopeStats};

/// Parse a full coverage report text into file, directory, and
/// repository reports.
///
/// This is the error boundary: any whole-parse failure (e.g. an I/O
/// error from a reader-backed scan) yields an empty list instead of
/// propagating, so callers always receive a well-typed result. The list
/// otherwise always ends with exactly one repository-level report whose
/// `full_path` is `"All"`, even for empty input.
#[must_use]
pub fn parse_coverage(input: &str) -> Vec<CoverageReport> {
    match parse_reader(&mut input.as_bytes()) {
        Ok(reports) => reports,
        Err(err) => {
            eprintln!("Warning: coverage parse failed: {err}");
            Vec::new()
        }
    }
}

/// Streaming scan core — reads line-by-line from a buffered reader so
/// the full report need not be in memory at once.
pub fn parse_reader(reader: &mut dyn BufRead) -> Result<Vec<CoverageReport>> {
    let mut repo_stats = ScopeStats::new();
    let mut dir_stats: IndexMap<String, ScopeStats> = IndexMap::new();
    let mut file_stats: IndexMap<String, ScopeStats> = IndexMap::new();

    let mut current_file: Option<String> = None;
    let mut current = ScopeStats::new();

    // When set, the current SF: was a test file; consume without
    // processing until the matching end_of_record.
    let mut skipping = false;

    let mut raw_line = String::new();
    loop {
        raw_line.clear();
        if reader.read_line(&mut raw_line)? == 0 {
            break; // EOF
        }
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if skipping {
            if line.starts_with("end_of_record") {
                skipping = false;
            }
            continue;
        }

        if line.starts_with("end_of_record") {
            if let Some(path) = current_file.take() {
                let finished = std::mem::take(&mut current);
                dir_stats
                    .entry(dirname(&path).to_string())
                    .or_default()
                    .merge(&finished);
                repo_stats.merge(&finished);
                file_stats.insert(path, finished);
            }
            continue;
        }

        let Some((tag, value)) = line.split_once(':') else {
            continue; // Not a record we understand
        };

        let handled = match tag {
            "SF" => {
                if is_test_file(value) {
                    current_file = None;
                    skipping = true;
                } else {
                    current_file = Some(value.to_string());
                    current = ScopeStats::new();
                }
                Ok(())
            }
            "TN" => {
                current.test_name = Some(value.to_string());
                Ok(())
            }
            "FN" => handle_fn(&mut current, value),
            "FNDA" => handle_fnda(&mut current, value),
            "FNF" => parse_count("FNF", value).map(|n| current.functions_total = n),
            "FNH" => parse_count("FNH", value).map(|n| current.functions_covered = n),
            "BRDA" => handle_brda(&mut current, value),
            "BRF" => parse_count("BRF", value).map(|n| current.branches_total = n),
            "BRH" => parse_count("BRH", value).map(|n| current.branches_covered = n),
            "DA" => handle_da(&mut current, value),
            "LF" => parse_count("LF", value).map(|n| current.lines_total = n),
            "LH" => parse_count("LH", value).map(|n| current.lines_covered = n),
            _ => Ok(()), // Unknown tag — ignore
        };

        if let Err(err) = handled {
            eprintln!("Warning: skipping record '{line}': {err}");
        }
    }

    let mut reports = Vec::with_capacity(file_stats.len() + dir_stats.len() + 1);
    for (path, stats) in &file_stats {
        reports.push(build_report(path, stats, ReportLevel::File));
    }
    for (path, stats) in &dir_stats {
        reports.push(build_report(path, stats, ReportLevel::Directory));
    }
    reports.push(build_report("All", &repo_stats, ReportLevel::Repository));

    Ok(reports)
}

/// `FN:` — a function declaration, added to the uncovered set until an
/// `FNDA:` record observes execution. Two arities share the tag; they
/// are disambiguated purely by comma count, and any other arity is
/// skipped silently.
fn handle_fn(stats: &mut ScopeStats, value: &str) -> Result<()> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [line, name] => {
            let line: u32 = line
                .parse()
                .map_err(|_| CovaggError::malformed("FN", value))?;
            stats.current_function = Some((*name).to_string());
            stats.uncovered_functions.insert(FunctionKey::TwoArg {
                line,
                name: (*name).to_string(),
            });
        }
        [start, end, name] => {
            let start_line: u32 = start
                .parse()
                .map_err(|_| CovaggError::malformed("FN", value))?;
            let end_line: u32 = end
                .parse()
                .map_err(|_| CovaggError::malformed("FN", value))?;
            stats.current_function = Some((*name).to_string());
            stats.uncovered_functions.insert(FunctionKey::ThreeArg {
                start_line,
                end_line,
                name: (*name).to_string(),
            });
        }
        _ => {}
    }
    Ok(())
}

/// `FNDA:` — execution count for a named function. A positive count
/// covers every declaration with that name, whatever its arity.
fn handle_fnda(stats: &mut ScopeStats, value: &str) -> Result<()> {
    let (count, name) = value
        .split_once(',')
        .ok_or_else(|| CovaggError::malformed("FNDA", value))?;
    let count: i64 = count
        .trim()
        .parse()
        .map_err(|_| CovaggError::malformed("FNDA", value))?;
    if count > 0 {
        stats.functions_covered += 1;
        stats.mark_function_covered(name);
    }
    stats.functions_total += 1;
    Ok(())
}

/// `BRDA:` — a branch record, deduplicated on its canonical descriptor.
///
/// The descriptor is inserted into the uncovered set before the `taken`
/// field is parsed: a record with a valid line/block but unparseable
/// `taken` leaves the descriptor behind and does not bump the total.
fn handle_brda(stats: &mut ScopeStats, value: &str) -> Result<()> {
    let record = branch::parse_brda(value)?;
    stats.uncovered_branches.insert(record.descriptor.clone());
    let taken = record.taken()?;
    if taken.is_hit() {
        stats.branches_covered += 1;
        stats.uncovered_branches.remove(&record.descriptor);
    }
    stats.branches_total += 1;
    Ok(())
}

/// `DA:` — a line execution record. A non-positive count (including the
/// negative counts some instrumenters emit) leaves the line uncovered.
fn handle_da(stats: &mut ScopeStats, value: &str) -> Result<()> {
    let (line, count) = value
        .split_once(',')
        .ok_or_else(|| CovaggError::malformed("DA", value))?;
    let line: u32 = line
        .trim()
        .parse()
        .map_err(|_| CovaggError::malformed("DA", value))?;
    let count: i64 = count
        .trim()
        .parse()
        .map_err(|_| CovaggError::malformed("DA", value))?;
    stats.lines_total += 1;
    if count > 0 {
        stats.lines_covered += 1;
    } else {
        stats.uncovered_lines.insert(line);
    }
    Ok(())
}

/// Summary overrides (`LF`/`LH`/`FNF`/`FNH`/`BRF`/`BRH`). Last write
/// wins: a later incrementing record can still mutate the counter, so
/// these are not one-shot locks.
fn parse_count(tag: &'static str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| CovaggError::malformed(tag, value))
}

/// Directory component of a slash-separated path: `""` for a bare
/// filename, `"/"` for a file at the root.
fn dirname(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => "",
    }
}

/// Test files are excluded from all reporting and rollup: a directory
/// component containing `tests`, or a filename starting with `test_` or
/// ending with `_test.py`.
fn is_test_file(path: &str) -> bool {
    let file_name = path.rsplit_once('/').map_or(path, |(_, name)| name);
    dirname(path).contains("tests")
        || file_name.starts_with("test_")
        || file_name.ends_with("_test.py")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("src/a.py"), "src");
        assert_eq!(dirname("src/sub/a.py"), "src/sub");
        assert_eq!(dirname("a.py"), "");
        assert_eq!(dirname("/a.py"), "/");
    }

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file("tests/test_foo.py"));
        assert!(is_test_file("src/tests/helper.py"));
        assert!(is_test_file("src/test_foo.py"));
        assert!(is_test_file("src/foo_test.py"));
        assert!(is_test_file("contests/entry.py")); // substring match on the directory
        assert!(!is_test_file("src/foo.py"));
        assert!(!is_test_file("src/testing.py"));
    }

    #[test]
    fn test_single_file_rollup() {
        let input = "SF:src/a.py\nDA:1,1\nDA:2,0\nLF:2\nLH:1\nend_of_record\n";
        let reports = parse_coverage(input);

        assert_eq!(reports.len(), 3);

        let file = &reports[0];
        assert_eq!(file.level, ReportLevel::File);
        assert_eq!(file.full_path, "src/a.py");
        assert_eq!(file.line_coverage, 50.0);
        assert_eq!(file.statement_coverage, 50.0);
        assert_eq!(file.uncovered_lines, "2");

        let dir = &reports[1];
        assert_eq!(dir.level, ReportLevel::Directory);
        assert_eq!(dir.full_path, "src");
        assert_eq!(dir.line_coverage, 50.0);

        let repo = &reports[2];
        assert_eq!(repo.level, ReportLevel::Repository);
        assert_eq!(repo.full_path, "All");
        assert_eq!(repo.line_coverage, 50.0);
    }

    #[test]
    fn test_empty_input_yields_single_repository_report() {
        let reports = parse_coverage("");

        assert_eq!(reports.len(), 1);
        let repo = &reports[0];
        assert_eq!(repo.level, ReportLevel::Repository);
        assert_eq!(repo.full_path, "All");
        assert_eq!(repo.line_coverage, 100.0);
        assert_eq!(repo.statement_coverage, 100.0);
        assert_eq!(repo.function_coverage, 100.0);
        assert_eq!(repo.branch_coverage, 100.0);
    }

    #[test]
    fn test_idempotent() {
        let input = "SF:src/a.py\nFN:1,main\nFNDA:2,main\nDA:1,1\nDA:2,0\n\
                     BRDA:2,0,0,1\nBRDA:2,0,1,-\nend_of_record\n";
        assert_eq!(parse_coverage(input), parse_coverage(input));
    }

    #[test]
    fn test_test_files_are_excluded_entirely() {
        let input = "SF:tests/test_foo.py\nDA:1,1\nDA:2,0\nend_of_record\n";
        let reports = parse_coverage(input);

        // No file report, no tests/ directory report, nothing in the
        // repository totals.
        assert_eq!(reports.len(), 1);
        let repo = &reports[0];
        assert_eq!(repo.full_path, "All");
        assert_eq!(repo.line_coverage, 100.0);
    }

    #[test]
    fn test_excluded_file_does_not_leak_into_following_file() {
        let input = "SF:tests/test_foo.py\nDA:1,0\nend_of_record\n\
                     SF:src/a.py\nDA:1,1\nend_of_record\n";
        let reports = parse_coverage(input);

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].full_path, "src/a.py");
        assert_eq!(reports[0].line_coverage, 100.0);
        assert_eq!(reports[0].uncovered_lines, "");
    }

    #[test]
    fn test_malformed_brda_is_skipped() {
        let input = "SF:src/a.py\nBRDA:a,b,c,d\nDA:1,1\nend_of_record\n";
        let reports = parse_coverage(input);

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].branch_coverage, 100.0); // no branches recorded
        assert_eq!(reports[0].line_coverage, 100.0);
    }

    #[test]
    fn test_malformed_da_and_fn_are_skipped() {
        let input = "SF:src/a.py\nDA:nope\nDA:1,x\nFN:x,main\nFN:1\nDA:2,1\nend_of_record\n";
        let reports = parse_coverage(input);

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].line_coverage, 100.0);
        assert_eq!(reports[0].function_coverage, 100.0);
    }

    #[test]
    fn test_records_before_any_sf_are_dropped() {
        let input = "DA:1,1\nDA:2,0\nend_of_record\nSF:src/a.py\nDA:3,1\nend_of_record\n";
        let reports = parse_coverage(input);

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].full_path, "src/a.py");
        assert_eq!(reports[0].line_coverage, 100.0);
        assert_eq!(reports[2].line_coverage, 100.0);
    }

    #[test]
    fn test_summary_overrides_are_last_write_wins() {
        // LH: sets lines_covered, but a later DA: still increments the
        // totals — overrides are not one-shot locks.
        let input = "SF:src/a.py\nLF:10\nLH:4\nDA:1,1\nend_of_record\n";
        let reports = parse_coverage(input);

        // 11 total (10 + 1), 5 covered (4 + 1)
        assert_eq!(reports[0].line_coverage, 45.45);
    }

    #[test]
    fn test_fnda_zero_count_counts_total_only() {
        let input = "SF:src/a.py\nFN:1,main\nFNDA:0,main\nend_of_record\n";
        let reports = parse_coverage(input);

        assert_eq!(reports[0].function_coverage, 0.0);
        // 0% function coverage suppresses the listing.
        assert_eq!(reports[0].uncovered_functions, "");
    }

    #[test]
    fn test_fnda_covers_all_arities_with_same_name() {
        let input = "SF:src/a.py\nFN:1,f\nFN:5,9,f\nFN:12,g\n\
                     FNDA:3,f\nFNDA:0,g\nend_of_record\n";
        let reports = parse_coverage(input);

        // f covered once, g uncovered: 1 covered / 2 total
        assert_eq!(reports[0].function_coverage, 50.0);
        assert_eq!(reports[0].uncovered_functions, "L12:g");
    }

    #[test]
    fn test_function_dedup_is_per_file_only() {
        // The same function name in two files stays independent: FNDA
        // in the first file does not cover the second file's copy.
        let input = "SF:src/a.py\nFN:1,run\nFNDA:1,run\nend_of_record\n\
                     SF:src/b.py\nFN:1,run\nFNDA:0,run\nend_of_record\n";
        let reports = parse_coverage(input);

        let repo = reports.last().unwrap();
        assert_eq!(repo.function_coverage, 50.0);
    }

    #[test]
    fn test_branch_dedup_on_canonical_descriptor() {
        // Same canonical descriptor seen twice, second occurrence taken:
        // the uncovered set ends empty while totals count both records.
        let input = "SF:src/a.py\nBRDA:4,0,0,-\nBRDA:4,0,0,2\nDA:4,1\nend_of_record\n";
        let reports = parse_coverage(input);

        assert_eq!(reports[0].branch_coverage, 50.0);
        assert_eq!(reports[0].uncovered_branches, "");
    }

    #[test]
    fn test_report_order_is_first_seen() {
        let input = "SF:b/one.py\nDA:1,1\nend_of_record\n\
                     SF:a/two.py\nDA:1,1\nend_of_record\n\
                     SF:b/three.py\nDA:1,1\nend_of_record\n";
        let reports = parse_coverage(input);

        let paths: Vec<&str> = reports.iter().map(|r| r.full_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["b/one.py", "a/two.py", "b/three.py", "b", "a", "All"]
        );
    }

    #[test]
    fn test_trailing_file_without_end_of_record_is_dropped() {
        let input = "SF:src/a.py\nDA:1,1\nend_of_record\nSF:src/b.py\nDA:1,0\n";
        let reports = parse_coverage(input);

        let paths: Vec<&str> = reports.iter().map(|r| r.full_path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.py", "src", "All"]);
    }

    #[test]
    fn test_tn_is_metadata_only() {
        let input = "TN:suite\nSF:src/a.py\nDA:1,1\nend_of_record\n";
        let reports = parse_coverage(input);

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].line_coverage, 100.0);
    }

    #[test]
    fn test_directory_and_repository_totals_sum_files() {
        let input = "SF:src/a.py\nDA:1,1\nDA:2,0\nend_of_record\n\
                     SF:src/b.py\nDA:1,1\nDA:2,1\nDA:3,0\nend_of_record\n\
                     SF:lib/c.py\nDA:1,0\nend_of_record\n";
        let reports = parse_coverage(input);

        let by_path = |p: &str| reports.iter().find(|r| r.full_path == p).unwrap();
        // src: 3 covered of 5 → 60%; lib: 0 of 1 → 0%; repo: 3 of 6 → 50%
        assert_eq!(by_path("src").line_coverage, 60.0);
        assert_eq!(by_path("lib").line_coverage, 0.0);
        assert_eq!(by_path("All").line_coverage, 50.0);
    }

    #[test]
    fn test_listings_empty_above_file_level() {
        let input = "SF:src/a.py\nFN:1,main\nFNDA:0,main\nDA:1,1\nDA:2,0\n\
                     BRDA:2,0,0,-\nBRDA:2,0,1,1\nend_of_record\n";
        let reports = parse_coverage(input);

        for report in reports.iter().filter(|r| r.level != ReportLevel::File) {
            assert_eq!(report.uncovered_lines, "");
            assert_eq!(report.uncovered_functions, "");
            assert_eq!(report.uncovered_branches, "");
        }
    }

    #[test]
    fn test_duplicate_sf_keeps_last_stats_but_double_counts_rollup() {
        // A path seen twice overwrites the file entry but both passes
        // contribute to the rollup, matching single-pass accumulation.
        let input = "SF:src/a.py\nDA:1,1\nend_of_record\n\
                     SF:src/a.py\nDA:1,0\nend_of_record\n";
        let reports = parse_coverage(input);

        let paths: Vec<&str> = reports.iter().map(|r| r.full_path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.py", "src", "All"]);
        assert_eq!(reports[0].line_coverage, 0.0);
        assert_eq!(reports[1].line_coverage, 50.0);
    }
}
