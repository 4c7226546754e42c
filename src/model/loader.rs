//! Model file resolution, downloading and session loading.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ort::session::Session;

use crate::error::{Error, Result};
use crate::pipeline::Config;

use super::ModelType;

/// Manages the model directory and downloads.
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
    base_url: Option<String>,
}

impl ModelCache {
    /// Create a new model cache.
    ///
    /// Without an explicit directory the platform cache directory is used:
    /// - Windows: `%LOCALAPPDATA%\deepstego\models`
    /// - Linux: `~/.cache/deepstego/models`
    /// - macOS: `~/Library/Caches/deepstego/models`
    ///
    /// Missing models are fetched from `{base_url}/{filename}` when a base URL
    /// is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new(cache_dir: Option<PathBuf>, base_url: Option<String>) -> Result<Self> {
        let cache_dir = cache_dir.unwrap_or_else(default_cache_dir);

        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self {
            cache_dir,
            base_url,
        })
    }

    /// Create the cache described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.model_dir.clone(), config.model_base_url.clone())
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the path to a model file, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotFound`] if the file is missing and no base URL
    /// is configured, or an error if the download fails.
    pub fn get_model_path(&self, model_type: ModelType) -> Result<PathBuf> {
        let path = self.cache_dir.join(model_type.filename());

        if path.exists() {
            return Ok(path);
        }

        let Some(base_url) = &self.base_url else {
            return Err(Error::ModelNotFound { path });
        };

        let url = format!("{}/{}", base_url.trim_end_matches('/'), model_type.filename());
        download_file(&url, &path, model_type.filename())?;

        Ok(path)
    }

    /// Load an ONNX model session.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be found or loaded.
    pub fn load_session(
        &self,
        model_type: ModelType,
        intra_threads: Option<usize>,
    ) -> Result<Session> {
        let path = self.get_model_path(model_type)?;

        tracing::info!("Loading {model_type} model from {}", path.display());

        let load_error = |source: ort::Error| Error::ModelLoad {
            name: model_type.filename().to_string(),
            source,
        };

        let mut builder = Session::builder().map_err(load_error)?;
        if let Some(threads) = intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|err| load_error(ort::Error::from(err)))?;
        }

        builder.commit_from_file(&path).map_err(load_error)
    }
}

fn default_cache_dir() -> PathBuf {
    let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("deepstego").join("models")
}

/// Download a file from a URL to a path with progress indication.
fn download_file(url: &str, path: &Path, name: &str) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let download_error = |source| Error::ModelDownload {
        name: name.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(download_error)?;

    let bar = match response.content_length() {
        Some(total) => ProgressBar::new(total).with_style(
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .expect("valid template")
                .progress_chars("=> "),
        ),
        None => ProgressBar::new_spinner(),
    };
    bar.set_message(name.to_string());

    // Only a complete file ever appears under the final name.
    let partial = path.with_extension("onnx.part");
    let written = fs::File::create(&partial).and_then(|mut file| {
        io::copy(&mut bar.wrap_read(response), &mut file)?;
        file.sync_all()
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&partial);
        return Err(Error::from(err));
    }

    fs::rename(&partial, path)?;
    bar.finish_and_clear();

    tracing::info!("Saved {name} to {}", path.display());
    Ok(())
}
