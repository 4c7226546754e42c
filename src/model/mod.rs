//! Model registry, loading and the inference gateway.

mod gateway;
mod loader;
mod onnx;

pub use gateway::ModelGateway;
pub use loader::ModelCache;
pub use onnx::OnnxModel;

use ndarray::ArrayD;

use crate::error::Result;
use crate::image::{ImageTensor, IMAGE_TENSOR_SHAPE};
use crate::text::{TextTensor, TEXT_CAPACITY, TEXT_TENSOR_SHAPE};

/// The pretrained networks the pipelines run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// Combines a secret image and a cover image into a stego image.
    Hide,
    /// Recovers the secret image from a stego image.
    Reveal,
    /// Embeds a text vector into an image.
    TextEncoder,
    /// Reads a text vector back out of a stego image.
    TextDecoder,
}

impl ModelType {
    /// Every model, in load order.
    pub const ALL: [Self; 4] = [Self::Hide, Self::Reveal, Self::TextEncoder, Self::TextDecoder];

    /// Short name used in logs, errors and thread names.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hide => "hide",
            Self::Reveal => "reveal",
            Self::TextEncoder => "text-encoder",
            Self::TextDecoder => "text-decoder",
        }
    }

    /// Get the filename for this model type.
    #[must_use]
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::Hide => "hide.onnx",
            Self::Reveal => "reveal.onnx",
            Self::TextEncoder => "text_encoder.onnx",
            Self::TextDecoder => "text_decoder.onnx",
        }
    }

    /// Inputs the model takes, in argument order.
    ///
    /// The hide model takes the secret first and the cover second.
    #[must_use]
    pub const fn inputs(&self) -> &'static [TensorKind] {
        match self {
            Self::Hide => &[TensorKind::Image, TensorKind::Image],
            Self::Reveal | Self::TextDecoder => &[TensorKind::Image],
            Self::TextEncoder => &[TensorKind::Image, TensorKind::Text],
        }
    }

    /// Kind of tensor the model produces.
    #[must_use]
    pub const fn output(&self) -> TensorKind {
        match self {
            Self::Hide | Self::Reveal | Self::TextEncoder => TensorKind::Image,
            Self::TextDecoder => TensorKind::Text,
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a tensor at the model boundary represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorKind {
    /// `(1, 224, 224, 3)` image.
    Image,
    /// `(1, 100)` code points.
    Text,
}

impl TensorKind {
    /// The fixed shape an input of this kind must have.
    #[must_use]
    pub const fn shape(self) -> &'static [usize] {
        match self {
            Self::Image => &IMAGE_TENSOR_SHAPE,
            Self::Text => &TEXT_TENSOR_SHAPE,
        }
    }

    /// Whether `shape` is acceptable as model output of this kind.
    ///
    /// Text output may carry more than one row; only the first is read.
    #[must_use]
    pub fn accepts_output(self, shape: &[usize]) -> bool {
        match self {
            Self::Image => shape == IMAGE_TENSOR_SHAPE,
            Self::Text => shape.len() == 2 && shape[0] >= 1 && shape[1] == TEXT_CAPACITY,
        }
    }
}

/// A tensor handed to a model.
#[derive(Debug, Clone)]
pub enum ModelTensor {
    Image(ImageTensor),
    Text(TextTensor),
}

impl ModelTensor {
    #[must_use]
    pub const fn kind(&self) -> TensorKind {
        match self {
            Self::Image(_) => TensorKind::Image,
            Self::Text(_) => TensorKind::Text,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Image(t) => t.shape(),
            Self::Text(t) => t.shape(),
        }
    }

    /// Copy into a dynamically shaped array.
    #[must_use]
    pub fn to_dyn(&self) -> ArrayD<f32> {
        match self {
            Self::Image(t) => t.clone().into_dyn(),
            Self::Text(t) => t.clone().into_dyn(),
        }
    }
}

/// An opaque network: tensors in, one tensor out.
///
/// Implementations do not need to be thread-safe; [`ModelGateway`] runs each
/// model on a single worker thread. Closures with the right signature are
/// models too, which is how tests stub the networks.
pub trait Model: Send {
    /// Run one inference.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying runtime fails.
    fn run(&mut self, inputs: &[ModelTensor]) -> Result<ArrayD<f32>>;
}

impl<F> Model for F
where
    F: FnMut(&[ModelTensor]) -> Result<ArrayD<f32>> + Send,
{
    fn run(&mut self, inputs: &[ModelTensor]) -> Result<ArrayD<f32>> {
        self(inputs)
    }
}
