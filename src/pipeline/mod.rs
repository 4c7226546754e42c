//! Steganography pipelines around the pretrained models.

mod hiding;
mod request;
mod revealing;
mod service;
mod shared;
mod text;

pub use hiding::HidingPipeline;
pub use request::{
    ImagePairRequest, ImageResponse, ImageTextRequest, SingleImageRequest, TextResponse,
};
pub use revealing::RevealingPipeline;
pub use service::{Config, Steganographer};
pub use text::{TextDecodingPipeline, TextEncodingPipeline};
