//! Image decoding and model-space conversion.

use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Largest accepted ratio between the long and short edge of an input.
/// The letterbox rule scales the short edge to the target, so the long edge
/// grows with the aspect ratio.
const MAX_ASPECT_RATIO: f64 = 16.0;

/// Decode raw image bytes into an 8-bit RGB image.
///
/// Any format the `image` crate can read is accepted. Alpha and greyscale
/// inputs are converted to three-channel RGB.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the bytes are not a readable image.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(|source| Error::Decode { source })?;
    Ok(img.to_rgb8())
}

/// Scaled content size for the letterbox placement rule.
///
/// Landscape and square images get their height set to the target height,
/// portrait images get their width set to the target width. The other edge
/// follows the aspect ratio and may overhang the canvas.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn letterbox_dimensions(size: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (width, height) = size;
    let (target_width, target_height) = target;
    let aspect_ratio = f64::from(width) / f64::from(height);

    if width < height {
        let new_height = (f64::from(target_width) / aspect_ratio).round() as u32;
        (target_width, new_height.max(1))
    } else {
        let new_width = (f64::from(target_height) * aspect_ratio).round() as u32;
        (new_width.max(1), target_height)
    }
}

/// Top-left position of the scaled content on the canvas.
///
/// Floor division, so content larger than the canvas gets a negative offset
/// and is cropped evenly on both sides.
#[must_use]
pub fn letterbox_offset(content: (u32, u32), target: (u32, u32)) -> (i64, i64) {
    let dx = i64::from(target.0) - i64::from(content.0);
    let dy = i64::from(target.1) - i64::from(content.1);
    (dx.div_euclid(2), dy.div_euclid(2))
}

/// Resize an image onto a black canvas of exactly `target` size.
///
/// The image keeps its aspect ratio, is resampled with a bicubic filter and
/// pasted at [`letterbox_offset`]. Pixels not covered by the content stay
/// `(0, 0, 0)`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedDimensions`] for empty images or aspect ratios
/// beyond 16:1.
pub fn resize_with_letterbox(image: &RgbImage, target: (u32, u32)) -> Result<RgbImage> {
    let (width, height) = image.dimensions();

    if width == 0 || height == 0 {
        return Err(Error::UnsupportedDimensions {
            width,
            height,
            reason: "image is empty".to_string(),
        });
    }

    let long = f64::from(width.max(height));
    let short = f64::from(width.min(height));
    if long / short > MAX_ASPECT_RATIO {
        return Err(Error::UnsupportedDimensions {
            width,
            height,
            reason: format!("aspect ratio exceeds {MAX_ASPECT_RATIO}:1"),
        });
    }

    let (new_width, new_height) = letterbox_dimensions((width, height), target);

    let resized = if (new_width, new_height) == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, new_width, new_height, FilterType::CatmullRom)
    };

    let mut canvas = RgbImage::from_pixel(target.0, target.1, Rgb([0, 0, 0]));
    let (offset_x, offset_y) = letterbox_offset((new_width, new_height), target);
    imageops::overlay(&mut canvas, &resized, offset_x, offset_y);

    Ok(canvas)
}

/// Convert an RGB image to a `(1, height, width, 3)` tensor in [0, 1].
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the pixel buffer does not match the
/// image dimensions.
pub fn to_model_space(image: &RgbImage) -> Result<ImageTensor> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let data: Vec<f32> = image.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();

    Array4::from_shape_vec((1, height, width, RGB_CHANNELS), data).map_err(|_| {
        Error::ShapeMismatch {
            expected: format!("{height}x{width}x{RGB_CHANNELS} pixel buffer"),
            actual: format!("{} values", image.as_raw().len()),
        }
    })
}
