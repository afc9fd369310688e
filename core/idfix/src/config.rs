use serde::Deserialize;

use crate::error::IdFixError;

/// Official ID photo canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 480;

/// Official ID photo canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 640;

/// Numeric framing targets for the auto-fit compositor.
///
/// The defaults are the published output contract (480×640 JPEG at quality 95,
/// face filling half the canvas height). Hosts may deserialize overrides from
/// JSON; every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FitConfig {
    /// Output width in pixels.
    pub canvas_width: u32,

    /// Output height in pixels.
    pub canvas_height: u32,

    /// Rendered face height as a fraction of the canvas height.
    pub face_height_ratio: f64,

    /// Vertical position of the face center as a fraction of the canvas height.
    /// Slightly below 0.5 leaves more room for the shoulders than the forehead.
    pub face_center_ratio: f64,

    /// Minimum free rows kept above the top edge of the face box.
    pub head_margin: u32,

    /// Rows of white left below the subject when it is shorter than the canvas.
    pub bottom_margin: u32,

    /// Detections below this confidence are ignored.
    pub min_face_confidence: f64,

    /// JPEG quality from 0.0 to 1.0.
    pub jpeg_quality: f32,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            face_height_ratio: 0.50,
            face_center_ratio: 0.52,
            head_margin: 10,
            bottom_margin: 8,
            min_face_confidence: 0.5,
            jpeg_quality: 0.95,
        }
    }
}

impl FitConfig {
    /// Parse a JSON object of overrides, e.g. `{"jpegQuality": 0.9}`.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Check that every target is usable before any pixel work starts.
    pub fn validate(&self) -> Result<(), IdFixError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(IdFixError::InvalidCanvas);
        }
        check_ratio("faceHeightRatio", self.face_height_ratio)?;
        check_ratio("faceCenterRatio", self.face_center_ratio)?;
        if !(0.0..=1.0).contains(&self.min_face_confidence) {
            return Err(IdFixError::InvalidConfidence(self.min_face_confidence));
        }
        if !(0.0..=1.0).contains(&self.jpeg_quality) {
            return Err(IdFixError::InvalidQuality(self.jpeg_quality));
        }
        Ok(())
    }
}

fn check_ratio(name: &'static str, value: f64) -> Result<(), IdFixError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(IdFixError::InvalidRatio(name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_output_contract() {
        let config = FitConfig::default();
        assert_eq!(config.canvas_width, 480);
        assert_eq!(config.canvas_height, 640);
        assert_eq!(config.head_margin, 10);
        assert_eq!(config.bottom_margin, 8);
        assert!((config.jpeg_quality - 0.95).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = FitConfig::from_json(r#"{"headMargin": 24, "jpegQuality": 0.8}"#).unwrap();
        assert_eq!(config.head_margin, 24);
        assert!((config.jpeg_quality - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.canvas_height, 640);
        assert!((config.face_center_ratio - 0.52).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_canvas_is_rejected() {
        let config = FitConfig {
            canvas_width: 0,
            ..FitConfig::default()
        };
        assert!(matches!(config.validate(), Err(IdFixError::InvalidCanvas)));
    }

    #[test]
    fn out_of_range_ratio_is_rejected() {
        let config = FitConfig {
            face_height_ratio: 1.5,
            ..FitConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(IdFixError::InvalidRatio("faceHeightRatio", _))
        ));
    }

    #[test]
    fn confidence_floor_is_a_closed_range() {
        for ok in [0.0, 1.0] {
            let config = FitConfig {
                min_face_confidence: ok,
                ..FitConfig::default()
            };
            assert!(config.validate().is_ok(), "{ok}");
        }
        let config = FitConfig {
            min_face_confidence: 1.2,
            ..FitConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, IdFixError::InvalidConfidence(_)));
        assert_eq!(
            err.to_string(),
            "minimum face confidence must be between 0.0 and 1.0, got 1.2"
        );
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let config = FitConfig {
            jpeg_quality: -0.1,
            ..FitConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(IdFixError::InvalidQuality(_))
        ));
    }
}
