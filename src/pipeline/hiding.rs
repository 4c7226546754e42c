//! Hiding a secret image inside a cover image.

use std::sync::Arc;

use crate::error::Result;
use crate::image::NormalizationProfile;
use crate::model::{ModelCache, ModelGateway, ModelType};

use super::shared::{ensure_model, run_normalized};
use super::Config;

/// Combines a cover and a secret image through the hide model.
#[derive(Debug, Clone)]
pub struct HidingPipeline {
    gateway: Arc<ModelGateway>,
    profile: NormalizationProfile,
}

impl HidingPipeline {
    /// Create a pipeline around a running hide model.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway serves another model or the profile is
    /// invalid.
    pub fn new(gateway: Arc<ModelGateway>, profile: NormalizationProfile) -> Result<Self> {
        ensure_model(&gateway, ModelType::Hide)?;
        profile.validate()?;
        Ok(Self { gateway, profile })
    }

    /// Load the hide model and build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn load(cache: &ModelCache, config: &Config) -> Result<Self> {
        let gateway = ModelGateway::load(cache, ModelType::Hide, config)?;
        Self::new(Arc::new(gateway), config.normalization)
    }

    /// Hide `secret` inside `cover` and return the stego image as PNG bytes.
    ///
    /// Both images are letterboxed to 224x224 and normalized with the same
    /// profile. The hide model takes the secret first.
    ///
    /// # Errors
    ///
    /// Returns an error if either input cannot be decoded or inference fails.
    pub fn hide(&self, cover: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
        tracing::info!(
            "Hiding {} byte secret in {} byte cover",
            secret.len(),
            cover.len()
        );
        run_normalized(&self.gateway, &self.profile, &[secret, cover])
    }
}
