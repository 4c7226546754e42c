//! Image decoding, letterboxing, tensor conversion and PNG encoding.

mod load;
mod normalize;
mod save;

pub use load::{
    decode_image, letterbox_dimensions, letterbox_offset, resize_with_letterbox, to_model_space,
};
pub use normalize::{denormalize, normalize, NormalizationProfile};
pub use save::{encode_png, to_display_space};

use ndarray::Array4;

use crate::error::Result;

/// Image tensor in NHWC format (batch, height, width, channels).
/// Values are in [0, 1] in model space, or profile-normalized.
pub type ImageTensor = Array4<f32>;

/// Side length of the square images the models were trained on.
pub const MODEL_IMAGE_SIZE: u32 = 224;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;

/// Shape every image tensor presented to a model must have.
pub const IMAGE_TENSOR_SHAPE: [usize; 4] = [
    1,
    MODEL_IMAGE_SIZE as usize,
    MODEL_IMAGE_SIZE as usize,
    RGB_CHANNELS,
];

/// Decode, letterbox to the model resolution and convert to model space.
///
/// This is the preprocessing shared by every pipeline. No normalization
/// profile is applied.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable image or the image has
/// dimensions that cannot be letterboxed.
pub fn prepare(bytes: &[u8]) -> Result<ImageTensor> {
    let image = decode_image(bytes)?;
    tracing::debug!("decoded {}x{} image", image.width(), image.height());

    let boxed = resize_with_letterbox(&image, (MODEL_IMAGE_SIZE, MODEL_IMAGE_SIZE))?;
    to_model_space(&boxed)
}

/// Quantize a model-space tensor and encode it as PNG bytes.
///
/// # Errors
///
/// Returns an error if the tensor is not a single RGB image or PNG encoding fails.
pub fn render(tensor: &ImageTensor) -> Result<Vec<u8>> {
    let image = to_display_space(tensor)?;
    encode_png(&image)
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_prepare_shape() {
        let bytes = png_bytes(&RgbImage::from_pixel(300, 200, Rgb([10, 20, 30])));
        let tensor = prepare(&bytes).unwrap();

        assert_eq!(tensor.shape(), &IMAGE_TENSOR_SHAPE);
    }

    #[test]
    fn test_prepare_rejects_garbage() {
        let err = prepare(b"definitely not an image").unwrap_err();
        assert!(matches!(err, crate::Error::Decode { .. }));
    }

    #[test]
    fn test_render_is_lossless_png() {
        let original = RgbImage::from_fn(224, 224, |x, y| Rgb([x as u8, y as u8, 7]));
        let bytes = png_bytes(&original);

        let rendered = render(&prepare(&bytes).unwrap()).unwrap();
        let decoded = ::image::load_from_memory_with_format(&rendered, ImageFormat::Png)
            .unwrap()
            .to_rgb8();

        assert_eq!(decoded, original);
    }
}
