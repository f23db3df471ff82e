//! Mutable coverage state for one scope (file, directory, or repository),
//! plus the additive rollup merge applied at every file boundary.

use std::collections::HashSet;

/// Identity of a function declaration as it appeared in an `FN:` record.
///
/// The grammar carries two incompatible arities under the same tag:
/// Jest/Vitest and Flutter emit `FN:<line>,<name>`, while coverage.py
/// emits `FN:<start>,<end>,<name>`. Keeping them as distinct variants
/// makes the "match on name regardless of arity" rule used by `FNDA:`
/// removal explicit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionKey {
    TwoArg { line: u32, name: String },
    ThreeArg { start_line: u32, end_line: u32, name: String },
}

impl FunctionKey {
    /// The function name, regardless of arity.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            FunctionKey::TwoArg { name, .. } => name,
            FunctionKey::ThreeArg { name, .. } => name,
        }
    }

    /// The first numeric field, used for listing order.
    #[must_use]
    pub fn start_line(&self) -> u32 {
        match self {
            FunctionKey::TwoArg { line, .. } => *line,
            FunctionKey::ThreeArg { start_line, .. } => *start_line,
        }
    }
}

impl std::fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionKey::TwoArg { line, name } => write!(f, "L{line}:{name}"),
            FunctionKey::ThreeArg {
                start_line,
                end_line,
                name,
            } => write!(f, "L{start_line}-{end_line}:{name}"),
        }
    }
}

/// Counter/set bundle for one scope.
///
/// Counters may transiently disagree (e.g. `covered > total` between an
/// `LH:` override and subsequent `DA:` records); only the state at
/// `end_of_record` is reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeStats {
    pub lines_total: u64,
    pub lines_covered: u64,
    pub functions_total: u64,
    pub functions_covered: u64,
    pub branches_total: u64,
    pub branches_covered: u64,
    pub uncovered_lines: HashSet<u32>,
    pub uncovered_functions: HashSet<FunctionKey>,
    /// Canonical branch descriptors (see [`crate::branch`]).
    pub uncovered_branches: HashSet<String>,
    /// Test name from the most recent `TN:` record. Metadata only:
    /// excluded from rollup merges.
    pub test_name: Option<String>,
    /// Name of the most recently declared function. Metadata only:
    /// excluded from rollup merges.
    pub current_function: Option<String>,
}

impl ScopeStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Additively merge a finished child scope into this one: numeric
    /// fields sum, set fields union. The `test_name` and
    /// `current_function` metadata fields are skipped.
    pub fn merge(&mut self, child: &ScopeStats) {
        self.lines_total += child.lines_total;
        self.lines_covered += child.lines_covered;
        self.functions_total += child.functions_total;
        self.functions_covered += child.functions_covered;
        self.branches_total += child.branches_total;
        self.branches_covered += child.branches_covered;
        self.uncovered_lines.extend(child.uncovered_lines.iter().copied());
        self.uncovered_functions
            .extend(child.uncovered_functions.iter().cloned());
        self.uncovered_branches
            .extend(child.uncovered_branches.iter().cloned());
    }

    /// Drop every uncovered function whose name matches, whatever the
    /// arity of the original `FN:` record. Used when an `FNDA:` record
    /// reports a positive execution count.
    pub fn mark_function_covered(&mut self, name: &str) {
        self.uncovered_functions.retain(|f| f.name() != name);
    }
}
