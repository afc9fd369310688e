//! Accept/reject decision derived from a validation report.

use serde::Serialize;

use crate::report::{CriterionStatus, ValidationReport};

/// Criteria whose failure rejects the photo outright.
pub const FATAL_KEYS: [&str; 3] = ["faceDetected", "alignment", "accessories"];

/// Terminal decision of one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// A fatal criterion failed; nothing was composited.
    Rejected,
    /// The photo was accepted and composited.
    Processed,
    /// The photo was accepted but compositing produced no usable output.
    ProcessingFailed,
}

/// A single criterion surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    /// Criterion name as reported by the validation service.
    pub key: String,
    /// Reported status.
    pub status: CriterionStatus,
    /// Reported explanation.
    pub message: String,
}

/// Fatal issues and warnings extracted from a report.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Failed criteria from [`FATAL_KEYS`].
    pub fatal_issues: Vec<Issue>,
    /// Criteria with a warning status, fatal key or not.
    pub warnings: Vec<Issue>,
    /// `Rejected` iff `fatal_issues` is non-empty, `Processed` otherwise.
    pub decision: Decision,
}

impl Verdict {
    /// Whether the photo may proceed to compositing.
    pub fn is_accepted(&self) -> bool {
        self.decision != Decision::Rejected
    }
}

/// Classify every criterion of `report`.
///
/// A `failed` criterion outside [`FATAL_KEYS`] lands in neither list and does
/// not reject the photo (e.g. a failed background is still processed).
pub fn interpret(report: &ValidationReport) -> Verdict {
    let mut fatal_issues = Vec::new();
    let mut warnings = Vec::new();

    for (key, result) in report.criteria() {
        let issue = || Issue {
            key: key.to_string(),
            status: result.status,
            message: result.message.clone(),
        };
        match result.status {
            CriterionStatus::Failed if FATAL_KEYS.contains(&key) => fatal_issues.push(issue()),
            CriterionStatus::Warning => warnings.push(issue()),
            CriterionStatus::Failed | CriterionStatus::Passed => {}
        }
    }

    let decision = if fatal_issues.is_empty() {
        Decision::Processed
    } else {
        Decision::Rejected
    };

    Verdict {
        fatal_issues,
        warnings,
        decision,
    }
}
