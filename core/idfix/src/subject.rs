use image::{DynamicImage, RgbaImage};

use crate::error::{CollaboratorError, IdFixError, Stage};

/// Pluggable foreground/background separation backend.
///
/// The returned image must have the same dimensions as the input, with alpha
/// 0 on background and 255 on the subject. RGB values of subject pixels are
/// expected to be left untouched.
pub trait SubjectExtractor: Send + Sync {
    /// Isolate the subject of `image` in the alpha channel.
    fn extract(&self, image: &DynamicImage) -> Result<RgbaImage, CollaboratorError>;
}

/// Extractor that keeps every pixel as subject (alpha 255).
///
/// Used when no extractor is configured; the original background is then
/// composited as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueSubject;

impl SubjectExtractor for OpaqueSubject {
    fn extract(&self, image: &DynamicImage) -> Result<RgbaImage, CollaboratorError> {
        let mut rgba = image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            pixel.0[3] = 255;
        }
        Ok(rgba)
    }
}

/// Extractor that returns a mask computed elsewhere, e.g. a background-removed
/// PNG produced by the host application.
#[derive(Debug, Clone)]
pub struct PrecomputedSubject(pub RgbaImage);

impl PrecomputedSubject {
    /// Decode an encoded image (typically PNG with alpha).
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, IdFixError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| IdFixError::DecodeError(e.to_string()))?;
        Ok(Self(image.to_rgba8()))
    }
}

impl SubjectExtractor for PrecomputedSubject {
    fn extract(&self, _image: &DynamicImage) -> Result<RgbaImage, CollaboratorError> {
        Ok(self.0.clone())
    }
}

/// Run the extractor and check that its output matches the source geometry.
pub(crate) fn extract_subject(
    extractor: &dyn SubjectExtractor,
    image: &DynamicImage,
) -> Result<RgbaImage, IdFixError> {
    let subject = extractor
        .extract(image)
        .map_err(|e| IdFixError::collaborator(Stage::SubjectExtraction, e))?;

    if subject.dimensions() != (image.width(), image.height()) {
        return Err(IdFixError::malformed(
            Stage::SubjectExtraction,
            format!(
                "subject is {}x{}, source is {}x{}",
                subject.width(),
                subject.height(),
                image.width(),
                image.height()
            ),
        ));
    }

    Ok(subject)
}
