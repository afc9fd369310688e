use std::path::Path;

use image::RgbImage;

use crate::error::CollaboratorError;
use crate::face_locator::{FaceDetection, FaceLocator, RelativeBox};

/// Raw SeetaFace score the detector itself uses as its cut-off.
const SCORE_THRESHOLD: f64 = 2.0;

/// Face locator backed by the `rustface` crate (SeetaFace engine).
///
/// The SeetaFace model (`seeta_fd_frontal_v1.0.bin`) is not bundled; load it
/// from disk with [`RustfaceLocator::from_path`] or from memory with
/// [`RustfaceLocator::from_bytes`].
pub struct RustfaceLocator {
    model: rustface::Model,
}

impl RustfaceLocator {
    /// Load the SeetaFace model from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CollaboratorError> {
        let data = std::fs::read(path.as_ref()).map_err(|e| {
            CollaboratorError::new(format!(
                "failed to read face model {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_bytes(&data)
    }

    /// Load the SeetaFace model from bytes already in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CollaboratorError> {
        let model = rustface::read_model(std::io::Cursor::new(data))
            .map_err(|e| CollaboratorError::new(format!("failed to load face model: {e}")))?;
        Ok(Self { model })
    }
}

/// Map a raw SeetaFace score onto `[0, 1]`; the detector threshold lands on 0.5.
fn score_to_confidence(score: f64) -> f64 {
    1.0 / (1.0 + (-(score - SCORE_THRESHOLD)).exp())
}

/// Clip a pixel box to the image and express it relative to the image size.
///
/// SeetaFace boxes may extend past the image edge near the border.
fn clip_to_relative(x: i32, y: i32, w: u32, h: u32, width: u32, height: u32) -> RelativeBox {
    let clip = |start: i32, len: u32, limit: u32| {
        let lo = (start as i64).clamp(0, limit as i64);
        let hi = (start as i64 + len as i64).clamp(0, limit as i64);
        (lo as f64 / limit as f64, (hi - lo) as f64 / limit as f64)
    };
    let (xmin, bw) = clip(x, w, width);
    let (ymin, bh) = clip(y, h, height);
    RelativeBox {
        xmin,
        ymin,
        width: bw,
        height: bh,
    }
}

impl FaceLocator for RustfaceLocator {
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceDetection>, CollaboratorError> {
        let gray = image::imageops::grayscale(image);
        let (width, height) = (gray.width(), gray.height());

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(20);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceDetection {
                    bbox: clip_to_relative(
                        bbox.x(),
                        bbox.y(),
                        bbox.width(),
                        bbox.height(),
                        width,
                        height,
                    ),
                    confidence: score_to_confidence(face.score()),
                }
            })
            .collect())
    }
}
