//! Outward response shape handed to a transport layer.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::PipelineOutcome;
use crate::report::ValidationReport;
use crate::verdict::{Decision, Issue};

/// JSON-ready summary of one pipeline invocation. Images are base64 encoded.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    /// Identifier of the invocation, usable as a storage key.
    pub invocation_id: Uuid,
    /// `false` only when compositing failed.
    pub success: bool,
    /// Terminal decision.
    pub decision: Decision,
    /// Whether an output image was produced.
    pub accepted: bool,
    /// Failed fatal criteria.
    pub fatal_issues: Vec<Issue>,
    /// Criteria reported as warnings.
    pub warnings: Vec<Issue>,
    /// The report the decision was based on.
    pub validation_before: ValidationReport,
    /// What the compositor did; empty unless processed.
    pub processing_applied: Vec<String>,
    /// The submitted photo.
    pub input_image: String,
    /// The normalized photo, if one was produced.
    pub output_image: Option<String>,
    /// Failure description for `processing_failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessResponse {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&PipelineOutcome> for ProcessResponse {
    fn from(outcome: &PipelineOutcome) -> Self {
        let failed = outcome.decision == Decision::ProcessingFailed;
        Self {
            invocation_id: outcome.invocation_id,
            success: !failed,
            decision: outcome.decision,
            accepted: outcome.decision == Decision::Processed,
            fatal_issues: outcome.fatal_issues.clone(),
            warnings: outcome.warnings.clone(),
            validation_before: outcome.report.clone(),
            processing_applied: outcome.processing_applied.clone(),
            input_image: BASE64_STANDARD.encode(&outcome.input_image),
            output_image: outcome
                .output
                .as_ref()
                .map(|photo| BASE64_STANDARD.encode(&photo.data)),
            error: outcome.error.clone(),
        }
    }
}
