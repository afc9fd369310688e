//! Validation report produced by the external photo validation service.
//!
//! The service answers with one `{status, message}` object per named criterion
//! plus a numeric `overallScore`. Criteria keep the order the service emitted
//! them in, since that order is echoed back to callers.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::IdFixError;

/// Key of the aggregate score entry; every other key is a criterion.
pub const OVERALL_SCORE_KEY: &str = "overallScore";

/// Outcome of a single rubric criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionStatus {
    /// No issue.
    Passed,
    /// Fixable without retaking the photo.
    Warning,
    /// Requires a new photo.
    Failed,
}

impl CriterionStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionStatus::Passed => "passed",
            CriterionStatus::Warning => "warning",
            CriterionStatus::Failed => "failed",
        }
    }
}

/// Status and human-readable explanation for one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionResult {
    /// Classification of the criterion.
    pub status: CriterionStatus,
    /// Explanation from the validation service (may be empty).
    #[serde(default)]
    pub message: String,
}

/// Structured assessment of a photo against the ID photo rubric.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    criteria: Vec<(String, CriterionResult)>,
    overall_score: f64,
}

impl ValidationReport {
    /// Create an empty report with the given aggregate score.
    pub fn new(overall_score: f64) -> Self {
        Self {
            criteria: Vec::new(),
            overall_score,
        }
    }

    /// Append a criterion, replacing any earlier entry with the same key.
    pub fn with_criterion(
        mut self,
        key: impl Into<String>,
        status: CriterionStatus,
        message: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let result = CriterionResult {
            status,
            message: message.into(),
        };
        match self.criteria.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = result,
            None => self.criteria.push((key, result)),
        }
        self
    }

    /// Criteria in report order, excluding the aggregate score.
    pub fn criteria(&self) -> impl Iterator<Item = (&str, &CriterionResult)> {
        self.criteria.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up a single criterion.
    pub fn get(&self, key: &str) -> Option<&CriterionResult> {
        self.criteria
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Aggregate score in `[0, 100]`.
    pub fn overall_score(&self) -> f64 {
        self.overall_score
    }

    /// Decode a report from a strict JSON object.
    pub fn from_json(json: &str) -> Result<Self, IdFixError> {
        let object: Map<String, Value> =
            serde_json::from_str(json).map_err(|e| IdFixError::ReportDecode(e.to_string()))?;

        let mut overall_score = None;
        let mut criteria = Vec::with_capacity(object.len());
        for (key, value) in object {
            if key == OVERALL_SCORE_KEY {
                let score = value.as_f64().ok_or_else(|| {
                    IdFixError::ReportDecode(format!("{OVERALL_SCORE_KEY} is not a number"))
                })?;
                if !(0.0..=100.0).contains(&score) {
                    return Err(IdFixError::ReportDecode(format!(
                        "{OVERALL_SCORE_KEY} out of range: {score}"
                    )));
                }
                overall_score = Some(score);
                continue;
            }
            let result: CriterionResult = serde_json::from_value(value)
                .map_err(|e| IdFixError::ReportDecode(format!("criterion {key}: {e}")))?;
            criteria.push((key, result));
        }

        let overall_score = overall_score
            .ok_or_else(|| IdFixError::ReportDecode(format!("missing {OVERALL_SCORE_KEY}")))?;

        Ok(Self {
            criteria,
            overall_score,
        })
    }

    /// Decode a report from raw model output, which may wrap the JSON object in
    /// markdown fences or surrounding prose.
    pub fn from_model_text(text: &str) -> Result<Self, IdFixError> {
        Self::from_json(&extract_json_object(text))
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.criteria.len() + 1))?;
        for (key, result) in &self.criteria {
            map.serialize_entry(key, result)?;
        }
        map.serialize_entry(OVERALL_SCORE_KEY, &self.overall_score)?;
        map.end()
    }
}

/// Reduce model output to the outermost `{ ... }` span, dropping code fences.
fn extract_json_object(text: &str) -> String {
    let mut text = text.trim().to_string();
    if text.starts_with("```") {
        text = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
    }
    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if last > first {
            return text[first..=last].to_string();
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "faceDetected": {"status": "passed", "message": "one face"},
        "background": {"status": "warning", "message": "off-white"},
        "lighting": {"status": "passed", "message": ""},
        "alignment": {"status": "passed", "message": "centered"},
        "accessories": {"status": "failed", "message": "sunglasses"},
        "overallScore": 62
    }"#;

    #[test]
    fn decodes_criteria_in_report_order() {
        let report = ValidationReport::from_json(SAMPLE).unwrap();
        let keys: Vec<&str> = report.criteria().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            ["faceDetected", "background", "lighting", "alignment", "accessories"]
        );
        assert_eq!(
            report.get("accessories").unwrap().status,
            CriterionStatus::Failed
        );
        assert_eq!(report.overall_score(), 62.0);
    }

    #[test]
    fn missing_message_defaults_to_empty() {
        let report =
            ValidationReport::from_json(r#"{"lighting": {"status": "warning"}, "overallScore": 80}"#)
                .unwrap();
        assert_eq!(report.get("lighting").unwrap().message, "");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result = ValidationReport::from_json(
            r#"{"lighting": {"status": "maybe", "message": ""}, "overallScore": 80}"#,
        );
        assert!(matches!(result, Err(IdFixError::ReportDecode(_))));
    }

    #[test]
    fn missing_score_is_rejected() {
        let result =
            ValidationReport::from_json(r#"{"lighting": {"status": "passed", "message": ""}}"#);
        assert!(matches!(result, Err(IdFixError::ReportDecode(_))));
    }

    #[test]
    fn score_out_of_range_is_rejected() {
        let result = ValidationReport::from_json(r#"{"overallScore": 140}"#);
        assert!(matches!(result, Err(IdFixError::ReportDecode(_))));
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(ValidationReport::from_json("[1, 2, 3]").is_err());
        assert!(ValidationReport::from_json("not json").is_err());
    }

    #[test]
    fn model_text_with_fences_is_unwrapped() {
        let text = format!("```json\n{SAMPLE}\n```");
        let report = ValidationReport::from_model_text(&text).unwrap();
        assert_eq!(report.criteria().count(), 5);
    }

    #[test]
    fn model_text_with_prose_is_unwrapped() {
        let text = format!("Here is the result:\n{SAMPLE}\nThanks.");
        let report = ValidationReport::from_model_text(&text).unwrap();
        assert_eq!(report.overall_score(), 62.0);
    }

    #[test]
    fn serializes_back_in_report_order() {
        let report = ValidationReport::new(90.0)
            .with_criterion("lighting", CriterionStatus::Passed, "ok")
            .with_criterion("background", CriterionStatus::Warning, "beige");
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"lighting":{"status":"passed","message":"ok"},"background":{"status":"warning","message":"beige"},"overallScore":90.0}"#
        );
    }

    #[test]
    fn with_criterion_replaces_existing_key() {
        let report = ValidationReport::new(50.0)
            .with_criterion("alignment", CriterionStatus::Passed, "")
            .with_criterion("alignment", CriterionStatus::Failed, "tilted");
        assert_eq!(report.criteria().count(), 1);
        assert_eq!(
            report.get("alignment").unwrap().status,
            CriterionStatus::Failed
        );
    }
}
