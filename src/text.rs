//! Fixed-length text <-> code point vectors for the text models.
//!
//! The text encoder consumes exactly [`TEXT_CAPACITY`] code points per image.
//! Shorter payloads are right-padded with spaces. Decoding strips whitespace
//! from both ends, so payload spaces at either edge do not come back.

use ndarray::{Array2, ArrayView1};

use crate::error::{Error, Result};

/// Number of characters a text vector carries.
pub const TEXT_CAPACITY: usize = 100;

/// Character used to fill the vector after the payload.
pub const PAD_CHAR: char = ' ';

/// Shape of the text tensor presented to a model.
pub const TEXT_TENSOR_SHAPE: [usize; 2] = [1, TEXT_CAPACITY];

/// `char::MAX` as a float, exactly representable.
const MAX_CODE_POINT: f32 = 1_114_111.0;

/// Text tensor in (batch, position) format.
pub type TextTensor = Array2<f32>;

/// Exactly [`TEXT_CAPACITY`] Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextVector([char; TEXT_CAPACITY]);

impl TextVector {
    /// The code point of every position.
    #[must_use]
    pub fn codes(&self) -> [u32; TEXT_CAPACITY] {
        self.0.map(u32::from)
    }

    /// Build the `(1, 100)` tensor fed to the text encoder.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_tensor(&self) -> TextTensor {
        Array2::from_shape_fn((1, TEXT_CAPACITY), |(_, i)| u32::from(self.0[i]) as f32)
    }

    /// Read one row of text decoder output.
    ///
    /// Values are truncated toward zero like an integer cast, so `104.9`
    /// becomes `'h'`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the row is not 100 long, or
    /// [`Error::InvalidCodePoint`] for negative, non-finite or non-scalar
    /// values.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_model_row(row: ArrayView1<'_, f32>) -> Result<Self> {
        if row.len() != TEXT_CAPACITY {
            return Err(Error::ShapeMismatch {
                expected: format!("{TEXT_CAPACITY} code points"),
                actual: format!("{} values", row.len()),
            });
        }

        let mut chars = [PAD_CHAR; TEXT_CAPACITY];
        for (position, (&value, slot)) in row.iter().zip(chars.iter_mut()).enumerate() {
            let truncated = value.trunc();
            // Safe: range checked before the cast, NaN fails the check
            let decoded = if (0.0..=MAX_CODE_POINT).contains(&truncated) {
                char::from_u32(truncated as u32)
            } else {
                None
            };
            *slot = decoded.ok_or(Error::InvalidCodePoint { position, value })?;
        }

        Ok(Self(chars))
    }
}

/// Pad `text` with spaces to 100 characters and map each to its code point.
///
/// # Errors
///
/// Returns [`Error::TextLength`] if `text` has more than 100 characters.
/// Nothing is truncated.
pub fn text_to_vector(text: &str) -> Result<TextVector> {
    let length = text.chars().count();
    if length > TEXT_CAPACITY {
        return Err(Error::TextLength {
            length,
            capacity: TEXT_CAPACITY,
        });
    }

    let mut chars = [PAD_CHAR; TEXT_CAPACITY];
    for (slot, c) in chars.iter_mut().zip(text.chars()) {
        *slot = c;
    }

    Ok(TextVector(chars))
}

/// Convert a vector back to text, stripping surrounding whitespace.
///
/// The strip removes padding, stray whitespace the decoder put in front, and
/// any leading or trailing whitespace that was part of the payload.
#[must_use]
pub fn vector_to_text(vector: &TextVector) -> String {
    let text: String = vector.0.iter().collect();
    text.trim().to_string()
}
