//! Branch descriptor normalization for `BRDA:` records.
//!
//! The third BRDA field is a dialect battleground. Native LCOV (and the
//! Jest/Vitest and Flutter emitters) put a numeric branch id there, while
//! coverage.py emits one of four textual forms:
//!
//!   BRDA:<line>,<block>,jump to line <target>,<taken>
//!   BRDA:<line>,<block>,jump to the function exit,<taken>
//!   BRDA:<line>,<block>,return from function '<name>',<taken>
//!   BRDA:<line>,<block>,exit the module,<taken>
//!
//! All of them collapse into one canonical string,
//! `"line {line}, block {block}, <suffix>"`, which serves as both the
//! dedup key and the display form.

use crate::error::{CovaggError, Result};

/// The `<taken>` field of a BRDA record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taken {
    /// The branch was never reached (`-`).
    NotExecuted,
    /// The branch was evaluated this many times (may be zero).
    Count(i64),
}

impl Taken {
    #[must_use]
    pub fn is_hit(self) -> bool {
        matches!(self, Taken::Count(n) if n > 0)
    }
}

/// A BRDA payload with its descriptor already normalized. The `taken`
/// field is kept raw so the caller controls when (and whether) it is
/// parsed; see [`BranchRecord::taken`].
#[derive(Debug)]
pub struct BranchRecord<'a> {
    /// Canonical descriptor, e.g. `"line 4, block 0, branch 1"`.
    pub descriptor: String,
    raw_taken: &'a str,
}

impl<'a> BranchRecord<'a> {
    /// Parse the raw `<taken>` field.
    pub fn taken(&self) -> Result<Taken> {
        if self.raw_taken == "-" {
            return Ok(Taken::NotExecuted);
        }
        self.raw_taken
            .trim()
            .parse::<i64>()
            .map(Taken::Count)
            .map_err(|_| CovaggError::malformed("BRDA", self.raw_taken))
    }
}

/// Parse a `BRDA:` payload (everything after the tag) into a normalized
/// [`BranchRecord`].
pub fn parse_brda(payload: &str) -> Result<BranchRecord<'_>> {
    let fields: Vec<&str> = payload.split(',').collect();
    let [line, block, descriptor, taken] = fields.as_slice() else {
        return Err(CovaggError::malformed("BRDA", payload));
    };

    let line: i64 = line
        .trim()
        .parse()
        .map_err(|_| CovaggError::malformed("BRDA", payload))?;
    let block: i64 = block
        .trim()
        .parse()
        .map_err(|_| CovaggError::malformed("BRDA", payload))?;

    let suffix = if let Some(target) = descriptor.strip_prefix("jump to line ") {
        format!("if branch: {line} -> {target}")
    } else if *descriptor == "jump to the function exit" {
        "function exit".to_string()
    } else if descriptor.starts_with("return from function ") {
        let name = descriptor.replacen("return from function '", "", 1);
        format!("return from: {}", name.trim_end_matches('\''))
    } else if *descriptor == "exit the module" {
        "module exit".to_string()
    } else {
        let branch: i64 = descriptor
            .trim()
            .parse()
            .map_err(|_| CovaggError::malformed("BRDA", payload))?;
        format!("branch {branch}")
    };

    Ok(BranchRecord {
        descriptor: format!("line {line}, block {block}, {suffix}"),
        raw_taken: *taken,
    })
}
