use crate::error::CollaboratorError;

/// Pluggable photo validation service (typically a vision model).
///
/// Implementations return the service's raw text answer; the pipeline extracts
/// and decodes the JSON report from it. Answers may differ between calls for
/// the same photo.
pub trait PhotoValidator: Send + Sync {
    /// Assess the encoded photo against the ID photo rubric.
    fn validate(&self, image: &[u8]) -> Result<String, CollaboratorError>;
}

/// Validator that always answers with the same text.
#[derive(Debug, Clone)]
pub struct CannedValidation(pub String);

impl PhotoValidator for CannedValidation {
    fn validate(&self, _image: &[u8]) -> Result<String, CollaboratorError> {
        Ok(self.0.clone())
    }
}
