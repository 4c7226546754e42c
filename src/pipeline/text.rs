//! Embedding text in images and reading it back.
//!
//! Unlike the image pipelines these work on plain [0, 1] model space: the text
//! models were trained without a normalization profile.

use std::sync::Arc;

use ndarray::Ix2;

use crate::error::{Error, Result};
use crate::image;
use crate::model::{ModelCache, ModelGateway, ModelTensor, ModelType};
use crate::text::{text_to_vector, vector_to_text, TextVector};

use super::shared::{ensure_model, into_image};
use super::Config;

/// Embeds up to 100 characters of text into an image.
#[derive(Debug, Clone)]
pub struct TextEncodingPipeline {
    gateway: Arc<ModelGateway>,
}

impl TextEncodingPipeline {
    /// Create a pipeline around a running text encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway serves another model.
    pub fn new(gateway: Arc<ModelGateway>) -> Result<Self> {
        ensure_model(&gateway, ModelType::TextEncoder)?;
        Ok(Self { gateway })
    }

    /// Load the text encoder and build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn load(cache: &ModelCache, config: &Config) -> Result<Self> {
        let gateway = ModelGateway::load(cache, ModelType::TextEncoder, config)?;
        Self::new(Arc::new(gateway))
    }

    /// Embed `text` into the image and return the stego image as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TextLength`] for text over 100 characters (checked
    /// before the image is touched), or an error if decoding or inference
    /// fails.
    pub fn encode_text_into_image(&self, image_bytes: &[u8], text: &str) -> Result<Vec<u8>> {
        let vector = text_to_vector(text)?;

        tracing::info!(
            "Encoding {} characters into {} byte image",
            text.chars().count(),
            image_bytes.len()
        );

        let image = image::prepare(image_bytes)?;
        let output = self.gateway.infer(vec![
            ModelTensor::Image(image),
            ModelTensor::Text(vector.to_tensor()),
        ])?;

        image::render(&into_image(output)?)
    }
}

/// Reads text embedded by [`TextEncodingPipeline`].
#[derive(Debug, Clone)]
pub struct TextDecodingPipeline {
    gateway: Arc<ModelGateway>,
}

impl TextDecodingPipeline {
    /// Create a pipeline around a running text decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway serves another model.
    pub fn new(gateway: Arc<ModelGateway>) -> Result<Self> {
        ensure_model(&gateway, ModelType::TextDecoder)?;
        Ok(Self { gateway })
    }

    /// Load the text decoder and build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn load(cache: &ModelCache, config: &Config) -> Result<Self> {
        let gateway = ModelGateway::load(cache, ModelType::TextDecoder, config)?;
        Self::new(Arc::new(gateway))
    }

    /// Read the hidden text from a stego image.
    ///
    /// Only the first row of the decoder output is used. Surrounding whitespace
    /// is stripped, including any that belonged to the original payload.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or inference fails, or the model produces
    /// values that are not code points.
    pub fn decode_text_from_image(&self, stego: &[u8]) -> Result<String> {
        tracing::info!("Decoding text from {} byte image", stego.len());

        let image = image::prepare(stego)?;
        let output = self.gateway.infer(vec![ModelTensor::Image(image)])?;

        let shape = output.shape().to_vec();
        let rows = output
            .into_dimensionality::<Ix2>()
            .map_err(|_| Error::ShapeMismatch {
                expected: "(N, 100) text tensor".to_string(),
                actual: format!("{shape:?}"),
            })?;

        let vector = TextVector::from_model_row(rows.row(0))?;
        Ok(vector_to_text(&vector))
    }
}
