//! Typed requests and responses for the service entry points.

/// A cover image and the secret image to hide in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePairRequest {
    pub cover: Vec<u8>,
    pub secret: Vec<u8>,
}

/// A single image: a stego image to reveal or decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleImageRequest {
    pub image: Vec<u8>,
}

/// An image and the text to embed in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTextRequest {
    pub image: Vec<u8>,
    pub text: String,
}

/// PNG-encoded output image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResponse {
    pub png: Vec<u8>,
}

/// Recovered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub text: String,
}
