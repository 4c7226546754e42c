//! Quantization and PNG encoding.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Convert a `(1, height, width, 3)` tensor in [0, 1] to an 8-bit RGB image.
///
/// Values are scaled by 255, rounded and clamped, so out-of-range model output
/// saturates instead of wrapping.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] unless the tensor holds exactly one RGB image.
pub fn to_display_space(tensor: &ImageTensor) -> Result<RgbImage> {
    let (batch, height, width, channels) = tensor.dim();

    if batch != 1 || channels != RGB_CHANNELS {
        return Err(Error::ShapeMismatch {
            expected: format!("(1, H, W, {RGB_CHANNELS})"),
            actual: format!("{:?}", tensor.shape()),
        });
    }

    let data: Vec<u8> = tensor.iter().copied().map(quantize).collect();

    let (w, h) = (
        u32::try_from(width).map_err(|_| oversized(tensor))?,
        u32::try_from(height).map_err(|_| oversized(tensor))?,
    );

    RgbImage::from_raw(w, h, data).ok_or_else(|| oversized(tensor))
}

/// Encode an RGB image as lossless 8-bit PNG bytes.
///
/// # Errors
///
/// Returns [`Error::Encode`] if the PNG writer fails.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| Error::Encode { source })?;
    Ok(bytes)
}

/// Quantize a value from [0, 1] to [0, 255] with rounding and clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

fn oversized(tensor: &ImageTensor) -> Error {
    Error::ShapeMismatch {
        expected: "image dimensions that fit in u32".to_string(),
        actual: format!("{:?}", tensor.shape()),
    }
}
