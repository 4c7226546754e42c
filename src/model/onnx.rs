//! ONNX Runtime backed models.

use ndarray::{ArrayD, IxDyn};
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};

use super::{Model, ModelCache, ModelTensor, ModelType};

/// A pretrained network loaded into an ONNX Runtime session.
pub struct OnnxModel {
    model_type: ModelType,
    session: Session,
}

impl OnnxModel {
    /// Load a model from the cache, downloading it if configured to.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file is missing or cannot be loaded.
    pub fn load(
        cache: &ModelCache,
        model_type: ModelType,
        intra_threads: Option<usize>,
    ) -> Result<Self> {
        let session = cache.load_session(model_type, intra_threads)?;

        tracing::debug!(
            "{model_type} inputs: {:?}",
            session.inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>()
        );

        Ok(Self {
            model_type,
            session,
        })
    }
}

impl Model for OnnxModel {
    fn run(&mut self, inputs: &[ModelTensor]) -> Result<ArrayD<f32>> {
        let mut values = Vec::with_capacity(inputs.len());
        for input in inputs {
            let value =
                Tensor::from_array(input.to_dyn()).map_err(|source| Error::Inference { source })?;
            values.push(value);
        }

        // Inputs are bound by position, in the order of the model signature.
        let mut values = values.into_iter();
        let outputs = match (values.next(), values.next(), values.next()) {
            (Some(first), None, None) => self.session.run(ort::inputs![first]),
            (Some(first), Some(second), None) => self.session.run(ort::inputs![first, second]),
            _ => {
                return Err(Error::ShapeMismatch {
                    expected: "one or two model inputs".to_string(),
                    actual: format!("{} inputs", inputs.len()),
                })
            }
        }
        .map_err(|source| Error::Inference { source })?;

        // Get first output
        let output = outputs
            .values()
            .next()
            .ok_or_else(|| Error::MalformedOutput {
                model: self.model_type.name(),
                expected: format!("{:?} output", self.model_type.output()),
                actual: "no output".to_string(),
            })?;

        extract_array(&output)
    }
}

/// Extract an f32 array of any rank from an ONNX value.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn extract_array(value: &ort::value::ValueRef<'_>) -> Result<ArrayD<f32>> {
    let (shape_info, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    // Safe: tensor dimensions are always non-negative and within bounds
    let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

    ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(|_| Error::ShapeMismatch {
        expected: format!("{dims:?}"),
        actual: format!("{} values", data.len()),
    })
}
