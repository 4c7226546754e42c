//! # deepstego
//!
//! Hide an image, or up to 100 characters of text, inside a cover image with
//! pretrained ONNX steganography models, and recover it later.
//!
//! The crate owns the deterministic parts around the networks: decoding,
//! letterboxing to 224x224, normalization, quantization, PNG encoding and the
//! fixed-length text codec. The networks themselves are opaque and run behind
//! a [`ModelGateway`] that serializes inference on a worker thread.
//!
//! ## Example
//!
//! ```no_run
//! use deepstego::{Config, ImagePairRequest, SingleImageRequest, Steganographer};
//!
//! # fn main() -> deepstego::Result<()> {
//! let steganographer = Steganographer::new(&Config::default())?;
//!
//! let stego = steganographer.hide(&ImagePairRequest {
//!     cover: std::fs::read("cover.jpg")?,
//!     secret: std::fs::read("secret.png")?,
//! })?;
//! let revealed = steganographer.reveal(&SingleImageRequest { image: stego.png })?;
//! std::fs::write("revealed.png", revealed.png)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;
pub mod text;

pub use error::{Error, Result};
pub use model::{Model, ModelCache, ModelGateway, ModelTensor, ModelType};
pub use pipeline::{
    Config, HidingPipeline, ImagePairRequest, ImageResponse, ImageTextRequest, RevealingPipeline,
    SingleImageRequest, Steganographer, TextDecodingPipeline, TextEncodingPipeline, TextResponse,
};
pub use text::{text_to_vector, vector_to_text, TextVector};
