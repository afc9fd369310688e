//! ID photo auto-fit: decide whether a photo is acceptable from a validation
//! report, then re-center the subject on a white 480×640 canvas.
//!
//! # Example
//!
//! ```no_run
//! use idfix::{CannedValidation, FixedDetections, PhotoPipeline, RelativeBox};
//!
//! let raw_bytes = std::fs::read("photo.jpg").unwrap();
//! let report = std::fs::read_to_string("report.json").unwrap();
//! let face = RelativeBox { xmin: 0.35, ymin: 0.10, width: 0.30, height: 0.20 };
//!
//! let outcome = PhotoPipeline::new(raw_bytes)
//!     .unwrap()
//!     .face_locator(Box::new(FixedDetections::single(face, 0.9)))
//!     .process(&CannedValidation(report))
//!     .unwrap();
//! println!("{}", outcome.to_response().to_json().unwrap());
//! ```
#![warn(missing_docs)]

mod compose;
mod config;
mod error;
/// Face location traits and data types.
pub mod face_locator;
mod pipeline;
/// Subject placement geometry.
pub mod placement;
mod report;
mod response;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace-based face locator backend.
pub mod rustface_backend;
mod subject;
mod validator;
mod verdict;

/// Pure compositing step and its result.
pub use compose::{compose, ComposedPhoto};
/// Framing targets and the default canvas size.
pub use config::{FitConfig, CANVAS_HEIGHT, CANVAS_WIDTH};
/// Error types returned by idfix operations.
pub use error::{CollaboratorError, IdFixError, Stage};
/// Face location trait and face box types.
pub use face_locator::{FaceBox, FaceDetection, FaceLocator, FixedDetections, RelativeBox};
/// Result of a pipeline invocation.
pub use pipeline::PipelineOutcome;
/// Placement transform types.
pub use placement::{Placement, PlacementBranch, PlacementTransform};
/// Validation report model.
pub use report::{CriterionResult, CriterionStatus, ValidationReport};
/// JSON response shape.
pub use response::ProcessResponse;
#[cfg(feature = "rustface")]
/// Built-in locator that loads a SeetaFace model.
pub use rustface_backend::RustfaceLocator;
/// Subject extraction trait and built-in extractors.
pub use subject::{OpaqueSubject, PrecomputedSubject, SubjectExtractor};
/// Validation service trait.
pub use validator::{CannedValidation, PhotoValidator};
/// Report interpretation.
pub use verdict::{interpret, Decision, Issue, Verdict, FATAL_KEYS};

use image::DynamicImage;
use uuid::Uuid;

use crate::pipeline::{run_pipeline, Invocation};

/// Builder for one ID photo pipeline invocation.
///
/// Decodes the input image on construction, then validates, locates the face,
/// extracts the subject, and composites it with configurable collaborators.
pub struct PhotoPipeline {
    input: Vec<u8>,
    image: DynamicImage,
    config: FitConfig,
    /// When `None`, no face is located and the fit-to-canvas placement is used.
    locator: Option<Box<dyn FaceLocator>>,
    /// When `None`, the photo is composited as-is ([`OpaqueSubject`]).
    extractor: Option<Box<dyn SubjectExtractor>>,
    invocation_id: Uuid,
}

impl PhotoPipeline {
    /// Create a pipeline from raw image bytes (JPEG, PNG, or WebP).
    ///
    /// Fails before any collaborator is called when the bytes are empty or
    /// cannot be decoded.
    pub fn new(input: Vec<u8>) -> Result<Self, IdFixError> {
        if input.is_empty() {
            return Err(IdFixError::EmptyInput);
        }
        compose::detect_format(&input)?;
        let image = compose::decode_image(&input)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(IdFixError::ZeroDimensions);
        }

        Ok(Self {
            input,
            image,
            config: FitConfig::default(),
            locator: None,
            extractor: None,
            invocation_id: Uuid::new_v4(),
        })
    }

    /// Replace all framing targets at once.
    pub fn config(mut self, config: FitConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the output canvas size (default: 480×640).
    pub fn canvas_size(mut self, width: u32, height: u32) -> Self {
        self.config.canvas_width = width;
        self.config.canvas_height = height;
        self
    }

    /// Set the JPEG quality from 0.0 to 1.0 (default: 0.95).
    pub fn jpeg_quality(mut self, quality: f32) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    /// Provide a face locator.
    ///
    /// ```no_run
    /// use idfix::{CollaboratorError, FaceDetection, FaceLocator, PhotoPipeline};
    ///
    /// struct MyLocator;
    /// impl FaceLocator for MyLocator {
    ///     fn detect(&self, _image: &image::RgbImage) -> Result<Vec<FaceDetection>, CollaboratorError> {
    ///         // Your detection logic here
    ///         Ok(vec![])
    ///     }
    /// }
    ///
    /// let bytes = std::fs::read("photo.jpg").unwrap();
    /// let pipeline = PhotoPipeline::new(bytes).unwrap().face_locator(Box::new(MyLocator));
    /// ```
    pub fn face_locator(mut self, locator: Box<dyn FaceLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Provide a subject extractor (background removal).
    pub fn subject_extractor(mut self, extractor: Box<dyn SubjectExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Override the generated invocation identifier, e.g. with a request id.
    pub fn invocation_id(mut self, id: Uuid) -> Self {
        self.invocation_id = id;
        self
    }

    /// Identifier callers can use to key stored inputs and outputs.
    pub fn id(&self) -> Uuid {
        self.invocation_id
    }

    /// Ask `validator` for a report, then run the pipeline with it.
    pub fn process(self, validator: &dyn PhotoValidator) -> Result<PipelineOutcome, IdFixError> {
        self.config.validate()?;
        let text = validator
            .validate(&self.input)
            .map_err(|e| IdFixError::collaborator(Stage::Validation, e))?;
        let report = ValidationReport::from_model_text(&text)?;
        self.process_with_report(report)
    }

    /// Run the pipeline with a report obtained elsewhere.
    pub fn process_with_report(
        self,
        report: ValidationReport,
    ) -> Result<PipelineOutcome, IdFixError> {
        self.config.validate()?;

        let extractor: &dyn SubjectExtractor = match self.extractor.as_deref() {
            Some(extractor) => extractor,
            None => &OpaqueSubject,
        };

        run_pipeline(
            Invocation {
                invocation_id: self.invocation_id,
                input: self.input,
                image: &self.image,
                config: &self.config,
                locator: self.locator.as_deref(),
                extractor,
                replaces_background: self.extractor.is_some(),
            },
            report,
        )
    }
}
