//! Pre- and post-processing shared by the image pipelines.

use ndarray::{ArrayD, Ix4};

use crate::error::{Error, Result};
use crate::image::{self, denormalize, normalize, ImageTensor, NormalizationProfile};
use crate::model::{ModelGateway, ModelTensor, ModelType};

/// Fail unless `gateway` serves `expected`.
pub(crate) fn ensure_model(gateway: &ModelGateway, expected: ModelType) -> Result<()> {
    if gateway.model_type() == expected {
        return Ok(());
    }

    Err(Error::InvalidParameter {
        name: "gateway".to_string(),
        reason: format!("expected the {expected} model, got {}", gateway.model_type()),
    })
}

/// Reinterpret validated model output as an image tensor.
pub(crate) fn into_image(output: ArrayD<f32>) -> Result<ImageTensor> {
    let shape = output.shape().to_vec();
    output
        .into_dimensionality::<Ix4>()
        .map_err(|_| Error::ShapeMismatch {
            expected: "4D image tensor".to_string(),
            actual: format!("{shape:?}"),
        })
}

/// Run an image-to-image model in normalized space.
///
/// Every input is decoded, letterboxed and normalized with `profile`; the
/// output is denormalized with clipping and encoded as PNG.
pub(crate) fn run_normalized(
    gateway: &ModelGateway,
    profile: &NormalizationProfile,
    images: &[&[u8]],
) -> Result<Vec<u8>> {
    let inputs = images
        .iter()
        .map(|bytes| Ok(ModelTensor::Image(normalize(&image::prepare(bytes)?, profile))))
        .collect::<Result<Vec<_>>>()?;

    let output = into_image(gateway.infer(inputs)?)?;

    image::render(&denormalize(&output, profile, true))
}
