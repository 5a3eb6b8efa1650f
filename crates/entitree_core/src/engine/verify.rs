//! Structural consistency check over every live node.

use super::TreeEngine;
use crate::error::TreeResult;
use entitree_store::{Record, RecordKey};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{info, warn};

/// Category of a consistency violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Code is empty or not a whole number of digit segments.
    MalformedCode,
    /// Two live rows share a code.
    DuplicateCode,
    /// The parent code names no live row.
    Orphan,
    /// Sibling orders are not exactly 1..=n.
    OrderGap,
    /// Stored order differs from the code's last segment.
    OrderMismatch,
    /// Stored level differs from the code length.
    LevelMismatch,
    /// Stored full name differs from the one derived from ancestors.
    FullNameMismatch,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::MalformedCode => "malformed code",
            ViolationKind::DuplicateCode => "duplicate code",
            ViolationKind::Orphan => "orphan",
            ViolationKind::OrderGap => "order gap",
            ViolationKind::OrderMismatch => "order mismatch",
            ViolationKind::LevelMismatch => "level mismatch",
            ViolationKind::FullNameMismatch => "full name mismatch",
        };
        f.write_str(s)
    }
}

/// One problem found by [`TreeEngine::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Offending row.
    pub key: RecordKey,
    /// Its code.
    pub code: String,
    /// What is wrong.
    pub kind: ViolationKind,
    /// Human-readable detail.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {:?} ({}): {}", self.kind, self.code, self.key, self.message)
    }
}

/// Result of [`TreeEngine::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of live rows inspected.
    pub rows_checked: usize,
    /// Problems found.
    pub violations: Vec<Violation>,
}

impl VerifyReport {
    /// True if no violation was found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, record: &Record, code: &str, kind: ViolationKind, message: String) {
        self.violations.push(Violation {
            key: record.key(),
            code: code.to_string(),
            kind,
            message,
        });
    }
}

impl TreeEngine {
    /// Checks every live row for the structural invariants of the tree.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::Storage`] if the store fails. Problems in
    /// the data are reported, not returned as errors.
    pub fn verify(&self) -> TreeResult<VerifyReport> {
        let rows = self.planner().all()?;
        let codec = self.metadata.codec();
        let mut report = VerifyReport {
            rows_checked: rows.len(),
            ..VerifyReport::default()
        };

        let mut by_code: HashMap<&str, &Record> = HashMap::new();
        let mut groups: BTreeMap<String, Vec<(u32, &Record)>> = BTreeMap::new();
        let mut full_names: HashMap<&str, String> = HashMap::new();

        for row in &rows {
            let code = self.code_of(row);
            let (level, order) = match codec.decode(code) {
                Ok(decoded) if !code.is_empty() => decoded,
                _ => {
                    report.push(row, code, ViolationKind::MalformedCode, "cannot decode".into());
                    continue;
                }
            };
            if by_code.insert(code, row).is_some() {
                report.push(row, code, ViolationKind::DuplicateCode, "code already used".into());
                continue;
            }

            let parent = codec.parent_of(code, 1);
            if !parent.is_empty() && !by_code.contains_key(parent) {
                report.push(
                    row,
                    code,
                    ViolationKind::Orphan,
                    format!("no live parent {parent:?}"),
                );
            }
            groups
                .entry(parent.to_string())
                .or_default()
                .push((order, row));

            if let Some(stored) = self.metadata.order_field().and_then(|f| row.int(f)) {
                if stored != i64::from(order) {
                    report.push(
                        row,
                        code,
                        ViolationKind::OrderMismatch,
                        format!("stored {stored}, code says {order}"),
                    );
                }
            }
            if let Some(stored) = self.metadata.level_field().and_then(|f| row.int(f)) {
                if stored != i64::from(level) {
                    report.push(
                        row,
                        code,
                        ViolationKind::LevelMismatch,
                        format!("stored {stored}, code says {level}"),
                    );
                }
            }

            if self.metadata.full_name_field().is_some() {
                let expected =
                    self.join_names(full_names.get(parent).map(String::as_str), &self.name_of(row));
                let stored = self.full_name_of(row).unwrap_or_default();
                if stored != expected {
                    report.push(
                        row,
                        code,
                        ViolationKind::FullNameMismatch,
                        format!("stored {stored:?}, expected {expected:?}"),
                    );
                }
                full_names.insert(code, expected);
            }
        }

        for (parent, mut siblings) in groups {
            siblings.sort_by_key(|(order, _)| *order);
            for (expected, (order, row)) in (1u32..).zip(&siblings) {
                if *order != expected {
                    report.push(
                        row,
                        self.code_of(row),
                        ViolationKind::OrderGap,
                        format!("order {order} under {parent:?}, expected {expected}"),
                    );
                    break;
                }
            }
        }

        if report.is_ok() {
            info!(table = self.metadata.table(), rows = report.rows_checked, "tree verified");
        } else {
            warn!(
                table = self.metadata.table(),
                rows = report.rows_checked,
                violations = report.violations.len(),
                "tree verification failed"
            );
        }
        Ok(report)
    }
}
