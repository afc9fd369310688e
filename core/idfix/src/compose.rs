use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde::Serialize;

use crate::config::FitConfig;
use crate::error::IdFixError;
use crate::face_locator::FaceBox;
use crate::placement::{compute_placement, Placement};

/// Lanczos3 kernel radius, in source pixels at unit scale.
const FILTER_RADIUS: f64 = 3.0;

/// Largest resampled window, as a multiple of the canvas area.
const MAX_WINDOW_CANVAS_MULTIPLE: i64 = 16;

/// Final normalized photo.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedPhoto {
    /// JPEG bytes of the canvas.
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Width of the output image in pixels.
    pub width: u32,

    /// Height of the output image in pixels.
    pub height: u32,

    /// Placement used to paste the subject.
    pub placement: Placement,

    /// Face box in source pixels that drove the placement, if any.
    pub face: Option<FaceBox>,
}

/// Decode input bytes into a `DynamicImage`.
pub(crate) fn decode_image(input: &[u8]) -> Result<DynamicImage, IdFixError> {
    image::load_from_memory(input).map_err(|e| IdFixError::DecodeError(e.to_string()))
}

/// Detect the input image format from the raw bytes.
pub(crate) fn detect_format(input: &[u8]) -> Result<ImageFormat, IdFixError> {
    image::guess_format(input).map_err(|e| IdFixError::DecodeError(e.to_string()))
}

/// Composite a subject pixel over white (255, 255, 255).
fn over_white(pixel: &Rgba<u8>) -> Rgb<u8> {
    let [r, g, b, a] = pixel.0;
    let alpha = a as f32 / 255.0;
    let inv_alpha = 1.0 - alpha;
    let blend = |c: u8| (c as f32 * alpha + 255.0 * inv_alpha).round() as u8;
    Rgb([blend(r), blend(g), blend(b)])
}

/// Window of one axis: source range to resample and where it lands in scaled space.
struct AxisWindow {
    src_start: u32,
    src_len: u32,
    dst_start: i64,
    dst_len: i64,
}

/// Source pixels needed to produce scaled pixels `[visible_start, visible_end)`.
///
/// Only the visible part of a heavily upscaled subject is resampled; the
/// margin covers the filter support so edges match a full resize.
fn axis_window(
    src_len: u32,
    scaled_len: u32,
    visible_start: i64,
    visible_end: i64,
) -> AxisWindow {
    let factor = scaled_len as f64 / src_len as f64;
    let margin = (FILTER_RADIUS * (1.0 / factor).max(1.0)).ceil() as i64 + 1;

    let src_start = ((visible_start as f64 / factor).floor() as i64 - margin).max(0);
    let src_end = ((visible_end as f64 / factor).ceil() as i64 + margin).min(src_len as i64);

    let dst_start = (src_start as f64 * factor).round() as i64;
    let dst_end = if src_end == src_len as i64 {
        scaled_len as i64
    } else {
        (src_end as f64 * factor).round() as i64
    };

    AxisWindow {
        src_start: src_start as u32,
        src_len: (src_end - src_start) as u32,
        dst_start,
        dst_len: (dst_end - dst_start).max(1),
    }
}

/// Paste the scaled subject onto a white canvas.
///
/// Pixels that land outside the canvas are clipped. Fails with
/// [`IdFixError::ResampleTooLarge`] when the filter margin around the visible
/// part would exceed the resampling budget (e.g. a face box a fraction of a
/// pixel tall).
pub(crate) fn render(
    subject: &RgbaImage,
    placement: &Placement,
    config: &FitConfig,
) -> Result<RgbImage, IdFixError> {
    let (canvas_w, canvas_h) = (config.canvas_width, config.canvas_height);
    let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, Rgb([255, 255, 255]));

    let offset_x = placement.transform.offset_x;
    let offset_y = placement.transform.offset_y;
    let scaled_w = placement.scaled_width as i64;
    let scaled_h = placement.scaled_height as i64;

    let visible_x = ((-offset_x).max(0), (canvas_w as i64 - offset_x).min(scaled_w));
    let visible_y = ((-offset_y).max(0), (canvas_h as i64 - offset_y).min(scaled_h));
    if visible_x.0 >= visible_x.1 || visible_y.0 >= visible_y.1 {
        return Ok(canvas);
    }

    let wx = axis_window(
        subject.width(),
        placement.scaled_width,
        visible_x.0,
        visible_x.1,
    );
    let wy = axis_window(
        subject.height(),
        placement.scaled_height,
        visible_y.0,
        visible_y.1,
    );

    let budget = MAX_WINDOW_CANVAS_MULTIPLE * canvas_w as i64 * canvas_h as i64;
    if wx.dst_len.saturating_mul(wy.dst_len) > budget {
        return Err(IdFixError::ResampleTooLarge {
            width: wx.dst_len,
            height: wy.dst_len,
        });
    }

    let window =
        image::imageops::crop_imm(subject, wx.src_start, wy.src_start, wx.src_len, wy.src_len)
            .to_image();
    let scaled = image::imageops::resize(
        &window,
        wx.dst_len as u32,
        wy.dst_len as u32,
        FilterType::Lanczos3,
    );

    for (x, y, pixel) in scaled.enumerate_pixels() {
        let cx = offset_x + wx.dst_start + x as i64;
        let cy = offset_y + wy.dst_start + y as i64;
        if cx < 0 || cy < 0 || cx >= canvas_w as i64 || cy >= canvas_h as i64 {
            continue;
        }
        canvas.put_pixel(cx as u32, cy as u32, over_white(pixel));
    }

    Ok(canvas)
}

/// Encode the canvas as JPEG at the given quality (0.0–1.0).
pub(crate) fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>, IdFixError> {
    let mut buffer = Vec::new();
    let quality_percent = ((quality * 100.0).round() as u8).clamp(1, 100);
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| IdFixError::EncodeError(e.to_string()))?;

    if buffer.is_empty() {
        return Err(IdFixError::EmptyOutput);
    }
    Ok(buffer)
}

/// Full compositing step: place → render → encode.
///
/// Deterministic given its inputs; `face` is in pixels of the image the
/// subject was extracted from (same dimensions as `subject`).
pub fn compose(
    subject: &RgbaImage,
    face: Option<&FaceBox>,
    config: &FitConfig,
) -> Result<ComposedPhoto, IdFixError> {
    config.validate()?;
    if subject.width() == 0 || subject.height() == 0 {
        return Err(IdFixError::ZeroDimensions);
    }

    let placement = compute_placement(subject.width(), subject.height(), face, config);
    tracing::debug!(
        branch = ?placement.branch,
        scale = placement.transform.scale,
        offset_x = placement.transform.offset_x,
        offset_y = placement.transform.offset_y,
        head_room_shift = placement.head_room_shift,
        bottom_shift = placement.bottom_shift,
        "computed placement"
    );

    let canvas = render(subject, &placement, config)?;
    let data = encode_jpeg(&canvas, config.jpeg_quality)?;

    Ok(ComposedPhoto {
        data,
        width: canvas.width(),
        height: canvas.height(),
        placement,
        face: face.copied(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::PlacementBranch;

    const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);
    // Same color as RED so resampling across the block edge only varies alpha.
    const CLEAR: Rgba<u8> = Rgba([220, 20, 20, 0]);

    /// Transparent subject with an opaque red block where the face is.
    fn subject_with_face_block(width: u32, height: u32, face: &FaceBox) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let (x, y) = (x as f64, y as f64);
            if x >= face.x && x < face.x + face.width && y >= face.y && y < face.y + face.height {
                RED
            } else {
                CLEAR
            }
        })
    }

    /// More than half covered by the red block once blended over white.
    fn is_red(pixel: &Rgb<u8>) -> bool {
        pixel.0[1] < 138
    }

    fn centered_face() -> FaceBox {
        FaceBox {
            x: 168.0,
            y: 64.0,
            width: 144.0,
            height: 128.0,
        }
    }

    #[test]
    fn transparent_pixel_becomes_white() {
        assert_eq!(over_white(&Rgba([255, 0, 0, 0])), Rgb([255, 255, 255]));
    }

    #[test]
    fn opaque_pixel_is_preserved() {
        assert_eq!(over_white(&Rgba([100, 150, 200, 255])), Rgb([100, 150, 200]));
    }

    #[test]
    fn semitransparent_pixel_blends_with_white() {
        let pixel = over_white(&Rgba([255, 0, 0, 128]));
        assert!((pixel.0[0] as i16 - 255).abs() <= 1);
        assert!((pixel.0[1] as i16 - 127).abs() <= 2);
        assert!((pixel.0[2] as i16 - 127).abs() <= 2);
    }

    #[test]
    fn rendered_face_is_half_canvas_height_and_centered() {
        let face = centered_face();
        let subject = subject_with_face_block(480, 640, &face);
        let config = FitConfig::default();
        let placement = compute_placement(480, 640, Some(&face), &config);
        let canvas = render(&subject, &placement, &config).unwrap();

        let red_rows: Vec<u32> = (0..640)
            .filter(|&y| is_red(canvas.get_pixel(240, y)))
            .collect();
        let face_height = red_rows.len() as i64;
        assert!((face_height - 320).abs() <= 1, "face height {face_height}");
        // Face top at offset 13 + 64 * 2.5
        assert!((red_rows[0] as i64 - 173).abs() <= 1);

        let red_cols: Vec<u32> = (0..480)
            .filter(|&x| is_red(canvas.get_pixel(x, 333)))
            .collect();
        let first = *red_cols.first().unwrap() as f64;
        let last = *red_cols.last().unwrap() as f64;
        let center = (first + last + 1.0) / 2.0;
        assert!((center - 240.0).abs() <= 1.0, "face center {center}");
    }

    #[test]
    fn head_room_above_face_stays_white() {
        // Fully opaque subject: rows above the pasted subject are canvas white.
        let subject = RgbaImage::from_pixel(480, 640, Rgba([40, 60, 80, 255]));
        let config = FitConfig::default();
        let placement = compute_placement(480, 640, Some(&centered_face()), &config);
        assert_eq!(placement.transform.offset_y, 13);
        let canvas = render(&subject, &placement, &config).unwrap();
        assert_eq!(canvas.get_pixel(240, 5), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(240, 100), &Rgb([40, 60, 80]));
        assert_eq!(canvas.get_pixel(0, 639), &Rgb([40, 60, 80]));
    }

    #[test]
    fn fallback_subject_is_centered() {
        // 1000x500 opaque subject → 480x240 band in the middle of the canvas.
        let subject = RgbaImage::from_pixel(1000, 500, Rgba([0, 0, 0, 255]));
        let config = FitConfig::default();
        let placement = compute_placement(1000, 500, None, &config);
        assert_eq!(placement.branch, PlacementBranch::FitToCanvas);
        let canvas = render(&subject, &placement, &config).unwrap();
        assert_eq!(canvas.get_pixel(240, 199), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(240, 200), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(240, 439), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(240, 440), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(0, 320), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(479, 320), &Rgb([0, 0, 0]));
    }

    #[test]
    fn transparent_subject_leaves_white_canvas() {
        let subject = RgbaImage::from_pixel(300, 400, CLEAR);
        let config = FitConfig::default();
        let placement = compute_placement(300, 400, None, &config);
        let canvas = render(&subject, &placement, &config).unwrap();
        assert!(canvas.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn canvas_size_is_fixed_for_any_subject() {
        let config = FitConfig::default();
        let cases: [(u32, u32, Option<FaceBox>); 4] = [
            (48, 64, None),
            (3000, 1000, None),
            (480, 640, Some(centered_face())),
            // Tiny face in a large photo: scale 160, only a sliver is resampled.
            (
                2000,
                2000,
                Some(FaceBox {
                    x: 1000.0,
                    y: 1000.0,
                    width: 2.0,
                    height: 2.0,
                }),
            ),
        ];
        for (w, h, face) in cases {
            let subject = RgbaImage::from_pixel(w, h, Rgba([90, 90, 90, 255]));
            let placement = compute_placement(w, h, face.as_ref(), &config);
            let canvas = render(&subject, &placement, &config).unwrap();
            assert_eq!(canvas.dimensions(), (480, 640), "{w}x{h}");
        }
    }

    #[test]
    fn sub_pixel_face_fails_cleanly_instead_of_allocating() {
        let subject = RgbaImage::from_pixel(1000, 1000, Rgba([90, 90, 90, 255]));
        let face = FaceBox {
            x: 500.0,
            y: 500.0,
            width: 0.01,
            height: 0.01,
        };
        let result = compose(&subject, Some(&face), &FitConfig::default());
        assert!(matches!(result, Err(IdFixError::ResampleTooLarge { .. })));
    }

    #[test]
    fn resample_limit_allows_small_faces_but_not_sub_pixel_ones() {
        let subject = RgbaImage::from_pixel(2000, 2000, Rgba([90, 90, 90, 255]));
        let config = FitConfig::default();
        let face = |size: f64| FaceBox {
            x: 1000.0,
            y: 1000.0,
            width: size,
            height: size,
        };

        // Scale 160: a window of roughly 1920x2080 scaled pixels.
        let placement = compute_placement(2000, 2000, Some(&face(2.0)), &config);
        assert!(render(&subject, &placement, &config).is_ok());

        // Scale 640: the filter margin alone spans thousands of pixels.
        let placement = compute_placement(2000, 2000, Some(&face(0.5)), &config);
        assert!(matches!(
            render(&subject, &placement, &config),
            Err(IdFixError::ResampleTooLarge { .. })
        ));
    }

    #[test]
    fn subject_entirely_off_canvas_is_not_an_error() {
        let subject = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let config = FitConfig::default();
        let mut placement = compute_placement(10, 10, None, &config);
        placement.transform.offset_x = 10_000;
        let canvas = render(&subject, &placement, &config).unwrap();
        assert!(canvas.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn windowed_resize_matches_full_resize_when_unclipped() {
        let subject = RgbaImage::from_fn(90, 120, |x, y| {
            Rgba([(x * 2) as u8, (y * 2) as u8, 128, 255])
        });
        let config = FitConfig::default();
        let placement = compute_placement(90, 120, None, &config);
        let canvas = render(&subject, &placement, &config).unwrap();
        let full = image::imageops::resize(&subject, 480, 640, FilterType::Lanczos3);
        for (x, y, pixel) in full.enumerate_pixels() {
            assert_eq!(canvas.get_pixel(x, y), &over_white(pixel), "({x}, {y})");
        }
    }

    #[test]
    fn encode_jpeg_produces_valid_output() {
        let img = RgbImage::from_pixel(48, 64, Rgb([10, 200, 30]));
        let data = encode_jpeg(&img, 0.95).unwrap();
        assert_eq!(data[0], 0xFF);
        assert_eq!(data[1], 0xD8);
    }

    #[test]
    fn compose_outputs_canvas_sized_jpeg() {
        let face = centered_face();
        let subject = subject_with_face_block(480, 640, &face);
        let photo = compose(&subject, Some(&face), &FitConfig::default()).unwrap();
        assert_eq!((photo.width, photo.height), (480, 640));
        assert_eq!(photo.placement.transform.offset_x, -360);
        assert_eq!(photo.face, Some(face));

        let decoded = image::load_from_memory(&photo.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (480, 640));
    }

    #[test]
    fn compose_rejects_invalid_config() {
        let subject = RgbaImage::from_pixel(10, 10, RED);
        let config = FitConfig {
            jpeg_quality: 2.0,
            ..FitConfig::default()
        };
        assert!(matches!(
            compose(&subject, None, &config),
            Err(IdFixError::InvalidQuality(_))
        ));
    }

    #[test]
    fn detect_format_rejects_garbage() {
        assert!(detect_format(b"not an image").is_err());
    }
}
