//! Placement of the extracted subject on the output canvas.
//!
//! Pure geometry: given the subject size, an optional face box and the framing
//! targets, compute one uniform scale and an integer offset. Nothing here
//! touches pixels, so the numbers can be checked without any collaborator.

use serde::Serialize;

use crate::config::FitConfig;
use crate::face_locator::FaceBox;

/// Absorbs float error in `len × scale` so an exact fit is not truncated by a pixel.
const SCALE_EPSILON: f64 = 1e-6;

/// Uniform scale and translation applied to the subject before pasting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacementTransform {
    /// Scale factor applied to both axes.
    pub scale: f64,
    /// Canvas x of the scaled subject's left edge (may be negative).
    pub offset_x: i64,
    /// Canvas y of the scaled subject's top edge (may be negative).
    pub offset_y: i64,
}

/// Which placement strategy produced a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementBranch {
    /// Scale from the face height and center on the face.
    FaceGuided,
    /// No face located: scale the whole subject to fit and center it.
    FitToCanvas,
}

/// A computed placement together with the intermediate values callers report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    /// The transform to render with.
    pub transform: PlacementTransform,
    /// Subject width after scaling.
    pub scaled_width: u32,
    /// Subject height after scaling.
    pub scaled_height: u32,
    /// Strategy used.
    pub branch: PlacementBranch,
    /// Rows the subject was pushed down to keep head room above the face.
    pub head_room_shift: i64,
    /// Rows the subject was pushed down to close the gap below the shoulders.
    pub bottom_shift: i64,
}

/// Saturates at `u32::MAX`; such scales are refused by the renderer's
/// resampling limit before any pixel work.
fn scaled_len(len: u32, scale: f64) -> u32 {
    ((len as f64 * scale + SCALE_EPSILON).floor() as u32).max(1)
}

/// Choose the face-guided placement when a face is known, the fit otherwise.
pub fn compute_placement(
    subject_width: u32,
    subject_height: u32,
    face: Option<&FaceBox>,
    config: &FitConfig,
) -> Placement {
    match face {
        Some(face) => face_guided(subject_width, subject_height, face, config),
        None => fit_to_canvas(subject_width, subject_height, config),
    }
}

/// Scale so the face spans `face_height_ratio` of the canvas, then position it.
///
/// The face is centered horizontally and its center placed at
/// `face_center_ratio` of the canvas height. Two corrections follow, in this
/// order and without re-checking the first:
///
/// 1. head room: push down until the face top sits `head_margin` rows below
///    the canvas top;
/// 2. bottom: if more than `bottom_margin` rows stay empty under the subject,
///    push down until exactly `bottom_margin` remain.
///
/// `face` is in pixels of the source image, which has the subject's size.
pub fn face_guided(
    subject_width: u32,
    subject_height: u32,
    face: &FaceBox,
    config: &FitConfig,
) -> Placement {
    let canvas_w = config.canvas_width as f64;
    let canvas_h = config.canvas_height as f64;

    let scale = canvas_h * config.face_height_ratio / face.height;
    let scaled_width = scaled_len(subject_width, scale);
    let scaled_height = scaled_len(subject_height, scale);

    // Per-axis factors from the truncated size, so face coordinates line up
    // with the pixels that are actually rendered.
    let scale_x = scaled_width as f64 / subject_width as f64;
    let scale_y = scaled_height as f64 / subject_height as f64;
    let face_center_x = face.center_x() * scale_x;
    let face_center_y = face.center_y() * scale_y;
    let face_top = face.y * scale_y;

    let offset_x = (canvas_w / 2.0 - face_center_x) as i64;
    let mut offset_y = (canvas_h * config.face_center_ratio - face_center_y).round() as i64;

    let mut head_room_shift = 0;
    let top_in_canvas = offset_y as f64 + face_top - config.head_margin as f64;
    if top_in_canvas < 0.0 {
        head_room_shift = (-top_in_canvas).ceil() as i64;
        offset_y += head_room_shift;
    }

    let mut bottom_shift = 0;
    let extra_space = config.canvas_height as i64 - (offset_y + scaled_height as i64);
    let bottom_margin = config.bottom_margin as i64;
    if extra_space > bottom_margin {
        bottom_shift = extra_space - bottom_margin;
        offset_y += bottom_shift;
    }

    Placement {
        transform: PlacementTransform {
            scale,
            offset_x,
            offset_y,
        },
        scaled_width,
        scaled_height,
        branch: PlacementBranch::FaceGuided,
        head_room_shift,
        bottom_shift,
    }
}

/// Largest uniform scale that keeps the whole subject inside the canvas,
/// centered on both axes.
pub fn fit_to_canvas(subject_width: u32, subject_height: u32, config: &FitConfig) -> Placement {
    let scale = (config.canvas_width as f64 / subject_width as f64)
        .min(config.canvas_height as f64 / subject_height as f64);

    let scaled_width = scaled_len(subject_width, scale).min(config.canvas_width);
    let scaled_height = scaled_len(subject_height, scale).min(config.canvas_height);

    Placement {
        transform: PlacementTransform {
            scale,
            offset_x: ((config.canvas_width - scaled_width) / 2) as i64,
            offset_y: ((config.canvas_height - scaled_height) / 2) as i64,
        },
        scaled_width,
        scaled_height,
        branch: PlacementBranch::FitToCanvas,
        head_room_shift: 0,
        bottom_shift: 0,
    }
}
