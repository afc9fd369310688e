use std::fmt;

use thiserror::Error;

/// Pipeline stage backed by an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The photo validation service.
    Validation,
    /// The face locator.
    FaceLocation,
    /// The subject (background removal) extractor.
    SubjectExtraction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::FaceLocation => "face location",
            Stage::SubjectExtraction => "subject extraction",
        };
        f.write_str(name)
    }
}

/// Failure reported by a collaborator implementation.
///
/// Collaborators only describe what went wrong; the pipeline attaches the
/// [`Stage`] when it turns this into an [`IdFixError::Collaborator`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    /// Build an error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors returned by idfix operations.
#[derive(Debug, Error)]
pub enum IdFixError {
    /// The input byte buffer was empty.
    #[error("no image data supplied")]
    EmptyInput,

    /// The input could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    /// The decoded image has zero width or height.
    #[error("image dimensions are zero")]
    ZeroDimensions,

    /// A collaborator failed or returned malformed output.
    #[error("{stage} failed: {message}")]
    Collaborator {
        /// Stage the collaborator serves.
        stage: Stage,
        /// Collaborator-supplied description.
        message: String,
    },

    /// The validation answer held no usable report.
    #[error("validation report could not be decoded: {0}")]
    ReportDecode(String),

    /// JPEG encoding failed.
    #[error("failed to encode image: {0}")]
    EncodeError(String),

    /// The visible part of the scaled subject needs too large a resampling
    /// window, e.g. for a face box a fraction of a pixel tall.
    #[error("resampling window {width}x{height} exceeds the compositing limit")]
    ResampleTooLarge {
        /// Window width in scaled pixels.
        width: i64,
        /// Window height in scaled pixels.
        height: i64,
    },

    /// The encoder returned no bytes.
    #[error("compositing produced an empty image")]
    EmptyOutput,

    /// JPEG quality outside 0.0 to 1.0.
    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),

    /// Canvas width or height is zero.
    #[error("canvas dimensions must be > 0")]
    InvalidCanvas,

    /// A framing ratio is out of range.
    #[error("{0} must be in (0, 1], got {1}")]
    InvalidRatio(&'static str, f64),

    /// The face confidence floor is outside 0.0 to 1.0.
    #[error("minimum face confidence must be between 0.0 and 1.0, got {0}")]
    InvalidConfidence(f64),
}

impl IdFixError {
    pub(crate) fn collaborator(stage: Stage, err: CollaboratorError) -> Self {
        IdFixError::Collaborator {
            stage,
            message: err.0,
        }
    }

    pub(crate) fn malformed(stage: Stage, message: impl Into<String>) -> Self {
        IdFixError::Collaborator {
            stage,
            message: format!("malformed output: {}", message.into()),
        }
    }
}
