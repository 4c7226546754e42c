//! `deepstego` CLI - hide images and text inside cover images.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deepstego::{
    Config, HidingPipeline, ModelCache, RevealingPipeline, TextDecodingPipeline,
    TextEncodingPipeline,
};

/// Hide images and short text inside cover images with pretrained models.
#[derive(Parser, Debug)]
#[command(name = "deepstego")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the ONNX model files.
    #[arg(long, global = true, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Base URL to download missing model files from.
    #[arg(long, global = true, value_name = "URL")]
    model_url: Option<String>,

    /// Seconds to wait for one inference.
    #[arg(long, global = true, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// ONNX Runtime intra-op threads per model.
    #[arg(long, global = true, value_name = "INT")]
    threads: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hide a secret image inside a cover image.
    Hide {
        /// Cover image path.
        #[arg(value_name = "COVER")]
        cover: PathBuf,

        /// Secret image path.
        #[arg(value_name = "SECRET")]
        secret: PathBuf,

        /// Output PNG path.
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Recover the secret image from a stego image.
    Reveal {
        /// Stego image path.
        #[arg(value_name = "STEGO")]
        stego: PathBuf,

        /// Output PNG path.
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Embed up to 100 characters of text into an image.
    EncodeText {
        /// Cover image path.
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Text to hide.
        #[arg(value_name = "TEXT")]
        text: String,

        /// Output PNG path.
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Print the text hidden in a stego image.
    DecodeText {
        /// Stego image path.
        #[arg(value_name = "STEGO")]
        stego: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("deepstego={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    // Build configuration
    let config = Config {
        model_dir: args.model_dir.clone(),
        model_base_url: args.model_url.clone(),
        inference_timeout: Duration::from_secs(args.timeout),
        intra_threads: args.threads,
        ..Config::default()
    };
    config.validate().context("Invalid configuration")?;

    let cache = ModelCache::from_config(&config).context("Failed to open model cache")?;

    match &args.command {
        Command::Hide {
            cover,
            secret,
            output,
        } => {
            let pipeline =
                HidingPipeline::load(&cache, &config).context("Failed to load hide model")?;
            let stego = pipeline
                .hide(&read_input(cover)?, &read_input(secret)?)
                .context("Failed to hide image")?;
            write_output(output, &stego)?;
        }
        Command::Reveal { stego, output } => {
            let pipeline =
                RevealingPipeline::load(&cache, &config).context("Failed to load reveal model")?;
            let secret = pipeline
                .reveal(&read_input(stego)?)
                .context("Failed to reveal image")?;
            write_output(output, &secret)?;
        }
        Command::EncodeText {
            image,
            text,
            output,
        } => {
            let pipeline = TextEncodingPipeline::load(&cache, &config)
                .context("Failed to load text encoder")?;
            let stego = pipeline
                .encode_text_into_image(&read_input(image)?, text)
                .context("Failed to encode text")?;
            write_output(output, &stego)?;
        }
        Command::DecodeText { stego } => {
            let pipeline = TextDecodingPipeline::load(&cache, &config)
                .context("Failed to load text decoder")?;
            let text = pipeline
                .decode_text_from_image(&read_input(stego)?)
                .context("Failed to decode text")?;
            println!("{text}");
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_output(path: &Path, png: &[u8]) -> Result<()> {
    fs::write(path, png).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
