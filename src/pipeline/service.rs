//! Configuration and the service front door.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::image::NormalizationProfile;
use crate::model::{ModelCache, ModelGateway, ModelType};

use super::request::{
    ImagePairRequest, ImageResponse, ImageTextRequest, SingleImageRequest, TextResponse,
};
use super::{HidingPipeline, RevealingPipeline, TextDecodingPipeline, TextEncodingPipeline};

/// Configuration for loading and running the models.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the ONNX files. None for the platform cache directory.
    pub model_dir: Option<PathBuf>,

    /// Base URL missing model files are downloaded from. None disables downloads.
    pub model_base_url: Option<String>,

    /// How long a caller waits for one inference, queueing included.
    pub inference_timeout: Duration,

    /// ONNX Runtime intra-op threads per model. None for the runtime default.
    pub intra_threads: Option<usize>,

    /// Normalization applied around the hide and reveal models.
    pub normalization: NormalizationProfile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_dir: None,
            model_base_url: None,
            inference_timeout: Duration::from_secs(30),
            intra_threads: None,
            normalization: NormalizationProfile::IMAGENET,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.inference_timeout.is_zero() {
            return Err(Error::InvalidParameter {
                name: "inference_timeout".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.intra_threads == Some(0) {
            return Err(Error::InvalidParameter {
                name: "intra_threads".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if let Some(url) = &self.model_base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidParameter {
                    name: "model_base_url".to_string(),
                    reason: format!("{url} is not an http(s) URL"),
                });
            }
        }

        self.normalization.validate()
    }
}

/// All four pipelines behind typed entry points.
///
/// Built once at startup; every method takes `&self`, so one instance can
/// serve many request threads at once.
#[derive(Debug, Clone)]
pub struct Steganographer {
    hiding: HidingPipeline,
    revealing: RevealingPipeline,
    text_encoding: TextEncodingPipeline,
    text_decoding: TextDecodingPipeline,
}

impl Steganographer {
    /// Load every model and build the service.
    ///
    /// This will download models if a base URL is configured and they are not
    /// already cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a model cannot be
    /// loaded.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing steganographer with config: {config:?}");

        let cache = ModelCache::from_config(config)?;
        let load = |model_type| ModelGateway::load(&cache, model_type, config).map(Arc::new);

        let steganographer = Self {
            hiding: HidingPipeline::new(load(ModelType::Hide)?, config.normalization)?,
            revealing: RevealingPipeline::new(load(ModelType::Reveal)?, config.normalization)?,
            text_encoding: TextEncodingPipeline::new(load(ModelType::TextEncoder)?)?,
            text_decoding: TextDecodingPipeline::new(load(ModelType::TextDecoder)?)?,
        };

        tracing::info!("Steganographer initialized successfully");
        Ok(steganographer)
    }

    /// Assemble the service from already built pipelines.
    #[must_use]
    pub const fn from_pipelines(
        hiding: HidingPipeline,
        revealing: RevealingPipeline,
        text_encoding: TextEncodingPipeline,
        text_decoding: TextDecodingPipeline,
    ) -> Self {
        Self {
            hiding,
            revealing,
            text_encoding,
            text_decoding,
        }
    }

    /// Hide the secret image inside the cover image.
    ///
    /// # Errors
    ///
    /// Returns an error if an image cannot be decoded or inference fails.
    pub fn hide(&self, request: &ImagePairRequest) -> Result<ImageResponse> {
        let png = self.hiding.hide(&request.cover, &request.secret)?;
        Ok(ImageResponse { png })
    }

    /// Recover the secret image from a stego image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be decoded or inference fails.
    pub fn reveal(&self, request: &SingleImageRequest) -> Result<ImageResponse> {
        let png = self.revealing.reveal(&request.image)?;
        Ok(ImageResponse { png })
    }

    /// Embed text into an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is too long, the image cannot be decoded
    /// or inference fails.
    pub fn encode_text(&self, request: &ImageTextRequest) -> Result<ImageResponse> {
        let png = self
            .text_encoding
            .encode_text_into_image(&request.image, &request.text)?;
        Ok(ImageResponse { png })
    }

    /// Read embedded text from a stego image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be decoded or inference fails.
    pub fn decode_text(&self, request: &SingleImageRequest) -> Result<TextResponse> {
        let text = self.text_decoding.decode_text_from_image(&request.image)?;
        Ok(TextResponse { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = Config {
            inference_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_threads() {
        let config = Config {
            intra_threads: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let config = Config {
            model_base_url: Some("ftp://models.example.com".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            model_base_url: Some("https://models.example.com/v1/".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_models_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            model_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };

        let err = Steganographer::new(&config).unwrap_err();
        assert!(matches!(err, Error::ModelNotFound { .. }));
    }
}
