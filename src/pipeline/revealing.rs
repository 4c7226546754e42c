//! Recovering a secret image from a stego image.

use std::sync::Arc;

use crate::error::Result;
use crate::image::NormalizationProfile;
use crate::model::{ModelCache, ModelGateway, ModelType};

use super::shared::{ensure_model, run_normalized};
use super::Config;

/// Extracts the secret image through the reveal model.
#[derive(Debug, Clone)]
pub struct RevealingPipeline {
    gateway: Arc<ModelGateway>,
    profile: NormalizationProfile,
}

impl RevealingPipeline {
    /// Create a pipeline around a running reveal model.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway serves another model or the profile is
    /// invalid.
    pub fn new(gateway: Arc<ModelGateway>, profile: NormalizationProfile) -> Result<Self> {
        ensure_model(&gateway, ModelType::Reveal)?;
        profile.validate()?;
        Ok(Self { gateway, profile })
    }

    /// Load the reveal model and build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn load(cache: &ModelCache, config: &Config) -> Result<Self> {
        let gateway = ModelGateway::load(cache, ModelType::Reveal, config)?;
        Self::new(Arc::new(gateway), config.normalization)
    }

    /// Recover the secret from `stego` and return it as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be decoded or inference fails.
    pub fn reveal(&self, stego: &[u8]) -> Result<Vec<u8>> {
        tracing::info!("Revealing secret from {} byte image", stego.len());
        run_normalized(&self.gateway, &self.profile, &[stego])
    }
}
