use image::RgbImage;
use serde::Serialize;

use crate::error::{CollaboratorError, IdFixError, Stage};

/// Face bounding box relative to the image size, each value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeBox {
    /// Left edge as a fraction of the image width.
    pub xmin: f64,
    /// Top edge as a fraction of the image height.
    pub ymin: f64,
    /// Box width as a fraction of the image width.
    pub width: f64,
    /// Box height as a fraction of the image height.
    pub height: f64,
}

/// A single face reported by a [`FaceLocator`].
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    /// Location of the face.
    pub bbox: RelativeBox,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Face bounding box in absolute pixels of the original image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceBox {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
}

impl FaceBox {
    /// Convert a relative box to pixels of a `width` × `height` image.
    pub fn from_relative(bbox: &RelativeBox, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self {
            x: bbox.xmin * w,
            y: bbox.ymin * h,
            width: bbox.width * w,
            height: bbox.height * h,
        }
    }

    /// Horizontal center of the box.
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Vertical center of the box.
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// Pluggable face location backend.
///
/// Implement this trait to plug in MediaPipe, ONNX, or any other engine.
/// Implementations may return several detections; only the most confident one
/// at or above the configured floor is used.
pub trait FaceLocator: Send + Sync {
    /// Detect faces in an RGB image.
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceDetection>, CollaboratorError>;
}

/// Face locator that replays detections computed elsewhere, e.g. by the host
/// application before handing the photo to this crate.
#[derive(Debug, Clone, Default)]
pub struct FixedDetections(pub Vec<FaceDetection>);

impl FixedDetections {
    /// A locator that reports one face with the given confidence.
    pub fn single(bbox: RelativeBox, confidence: f64) -> Self {
        Self(vec![FaceDetection { bbox, confidence }])
    }
}

impl FaceLocator for FixedDetections {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<FaceDetection>, CollaboratorError> {
        Ok(self.0.clone())
    }
}

/// Pick the primary face and convert it to absolute pixels.
///
/// Returns `Ok(None)` when nothing reaches `min_confidence`. A chosen
/// detection with non-finite coordinates, a non-positive size, or a value
/// outside `[0, 1]` is treated as malformed locator output.
pub(crate) fn primary_face(
    detections: &[FaceDetection],
    width: u32,
    height: u32,
    min_confidence: f64,
) -> Result<Option<FaceBox>, IdFixError> {
    let best = detections
        .iter()
        .filter(|d| d.confidence >= min_confidence)
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

    let Some(best) = best else {
        if !detections.is_empty() {
            tracing::debug!(
                count = detections.len(),
                min_confidence,
                "all face detections below confidence floor"
            );
        }
        return Ok(None);
    };

    let RelativeBox {
        xmin,
        ymin,
        width: bw,
        height: bh,
    } = best.bbox;
    if ![xmin, ymin, bw, bh].iter().all(|v| v.is_finite()) {
        return Err(IdFixError::malformed(
            Stage::FaceLocation,
            "non-finite face box coordinates",
        ));
    }
    if bw <= 0.0 || bh <= 0.0 {
        return Err(IdFixError::malformed(
            Stage::FaceLocation,
            format!("face box has non-positive size {bw}x{bh}"),
        ));
    }
    if ![xmin, ymin, bw, bh].iter().all(|v| (0.0..=1.0).contains(v)) {
        return Err(IdFixError::malformed(
            Stage::FaceLocation,
            format!("face box ({xmin}, {ymin}, {bw}x{bh}) is not relative to the image"),
        ));
    }

    Ok(Some(FaceBox::from_relative(&best.bbox, width, height)))
}
