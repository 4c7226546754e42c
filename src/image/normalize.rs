//! Per-channel normalization profiles.

use ndarray::Axis;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Per-channel mean and standard deviation used to map [0, 1] images into the
/// distribution a network was trained on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationProfile {
    pub mean: [f32; RGB_CHANNELS],
    pub std: [f32; RGB_CHANNELS],
}

impl NormalizationProfile {
    /// The ImageNet statistics the hide and reveal models expect.
    pub const IMAGENET: Self = Self {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };

    /// Validate the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is not finite or a deviation is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "normalization.mean".to_string(),
                reason: "must be finite".to_string(),
            });
        }

        if self.std.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(Error::InvalidParameter {
                name: "normalization.std".to_string(),
                reason: "must be finite and greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for NormalizationProfile {
    fn default() -> Self {
        Self::IMAGENET
    }
}

/// Apply `(x - mean) / std` to every channel of an NHWC tensor.
#[must_use]
pub fn normalize(tensor: &ImageTensor, profile: &NormalizationProfile) -> ImageTensor {
    let mut out = tensor.clone();
    for (c, mut channel) in out.axis_iter_mut(Axis(3)).enumerate() {
        let (mean, std) = (profile.mean[c], profile.std[c]);
        channel.mapv_inplace(|x| (x - mean) / std);
    }
    out
}

/// Inverse of [`normalize`]: `x * std + mean` per channel.
///
/// With `clip` the result is clamped to [0, 1], which discards out-of-range
/// model output before quantization.
#[must_use]
pub fn denormalize(tensor: &ImageTensor, profile: &NormalizationProfile, clip: bool) -> ImageTensor {
    let mut out = tensor.clone();
    for (c, mut channel) in out.axis_iter_mut(Axis(3)).enumerate() {
        let (mean, std) = (profile.mean[c], profile.std[c]);
        if clip {
            channel.mapv_inplace(|x| x.mul_add(std, mean).clamp(0.0, 1.0));
        } else {
            channel.mapv_inplace(|x| x.mul_add(std, mean));
        }
    }
    out
}
