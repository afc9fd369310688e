use image::DynamicImage;
use uuid::Uuid;

use crate::compose::{compose, ComposedPhoto};
use crate::config::FitConfig;
use crate::error::{IdFixError, Stage};
use crate::face_locator::{primary_face, FaceBox, FaceLocator};
use crate::placement::{Placement, PlacementBranch};
use crate::report::ValidationReport;
use crate::response::ProcessResponse;
use crate::subject::{extract_subject, SubjectExtractor};
use crate::verdict::{interpret, Decision, Issue};

/// Result of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Identifier of this invocation.
    pub invocation_id: Uuid,
    /// Terminal decision.
    pub decision: Decision,
    /// Failed fatal criteria.
    pub fatal_issues: Vec<Issue>,
    /// Criteria reported as warnings.
    pub warnings: Vec<Issue>,
    /// The report the decision was based on.
    pub report: ValidationReport,
    /// Descriptions of what the compositor did; empty unless processed.
    pub processing_applied: Vec<String>,
    /// The submitted photo bytes.
    pub input_image: Vec<u8>,
    /// The normalized photo when processed.
    pub output: Option<ComposedPhoto>,
    /// Compositor failure message when `decision` is `ProcessingFailed`.
    pub error: Option<String>,
}

impl PipelineOutcome {
    /// Whether a normalized photo was produced.
    pub fn is_accepted(&self) -> bool {
        self.decision == Decision::Processed
    }

    /// Status code a transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self.decision {
            Decision::Processed | Decision::Rejected => 200,
            Decision::ProcessingFailed => 500,
        }
    }

    /// Outward response with base64-encoded images.
    pub fn to_response(&self) -> ProcessResponse {
        ProcessResponse::from(self)
    }
}

/// Inputs of a single invocation, already decoded and validated.
pub(crate) struct Invocation<'a> {
    pub invocation_id: Uuid,
    pub input: Vec<u8>,
    pub image: &'a DynamicImage,
    pub config: &'a FitConfig,
    pub locator: Option<&'a dyn FaceLocator>,
    pub extractor: &'a dyn SubjectExtractor,
    pub replaces_background: bool,
}

/// validating → rejected | compositing → processed | processing_failed.
///
/// Collaborator failures are returned as errors; a compositor failure becomes
/// a `ProcessingFailed` outcome.
pub(crate) fn run_pipeline(
    invocation: Invocation<'_>,
    report: ValidationReport,
) -> Result<PipelineOutcome, IdFixError> {
    let Invocation {
        invocation_id,
        input,
        image,
        config,
        locator,
        extractor,
        replaces_background,
    } = invocation;

    let verdict = interpret(&report);
    tracing::info!(
        %invocation_id,
        decision = ?verdict.decision,
        fatal = verdict.fatal_issues.len(),
        warnings = verdict.warnings.len(),
        overall_score = report.overall_score(),
        "photo validated"
    );

    let mut outcome = PipelineOutcome {
        invocation_id,
        decision: verdict.decision,
        fatal_issues: verdict.fatal_issues,
        warnings: verdict.warnings,
        report,
        processing_applied: Vec::new(),
        input_image: input,
        output: None,
        error: None,
    };
    if outcome.decision == Decision::Rejected {
        return Ok(outcome);
    }

    let face = locate_face(locator, image, config)?;
    let subject = extract_subject(extractor, image)?;

    match compose(&subject, face.as_ref(), config) {
        Ok(photo) => {
            outcome.processing_applied =
                describe_processing(&photo.placement, config, replaces_background);
            outcome.output = Some(photo);
        }
        Err(err) => {
            tracing::warn!(%invocation_id, error = %err, "compositing failed");
            outcome.decision = Decision::ProcessingFailed;
            outcome.error = Some(err.to_string());
        }
    }

    Ok(outcome)
}

fn locate_face(
    locator: Option<&dyn FaceLocator>,
    image: &DynamicImage,
    config: &FitConfig,
) -> Result<Option<FaceBox>, IdFixError> {
    let Some(locator) = locator else {
        return Ok(None);
    };
    let detections = locator
        .detect(&image.to_rgb8())
        .map_err(|e| IdFixError::collaborator(Stage::FaceLocation, e))?;
    primary_face(
        &detections,
        image.width(),
        image.height(),
        config.min_face_confidence,
    )
}

/// Human-readable list of the adjustments a placement applied.
pub(crate) fn describe_processing(
    placement: &Placement,
    config: &FitConfig,
    replaces_background: bool,
) -> Vec<String> {
    let mut steps = vec![format!(
        "Resized the photo to {}×{} pixels to match the ID photo format.",
        config.canvas_width, config.canvas_height
    )];

    match placement.branch {
        PlacementBranch::FaceGuided => steps.push(format!(
            "Scaled the face to {:.0}% of the frame height and centered it based on the detected face position.",
            config.face_height_ratio * 100.0
        )),
        PlacementBranch::FitToCanvas => steps.push(
            "No face was located; scaled the whole subject to fit the frame and centered it."
                .to_string(),
        ),
    }
    if placement.head_room_shift > 0 {
        steps.push(format!(
            "Moved the subject down {} px to keep room above the head.",
            placement.head_room_shift
        ));
    }
    if placement.bottom_shift > 0 {
        steps.push(format!(
            "Lowered the shoulders {} px toward the bottom edge of the frame.",
            placement.bottom_shift
        ));
    }
    if replaces_background {
        steps.push(
            "Set the background to uniform white while leaving facial features unchanged."
                .to_string(),
        );
    }
    steps
}
