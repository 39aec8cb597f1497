//! # Batching
//!
//! Collates `(text_vec, target_vec)` pairs into padded token tensors.
//!
//! Rows are right-padded with the padding id `0` and sorted by input length,
//! longest first, so that a recurrent encoder can consume the batch as a
//! packed sequence.

use anyhow::Result;
use crate::backend::{Backend, TokenTensor};
use crate::tensor::constant::BATCH_DIM;
use crate::tensor::operations::pad_rows;

pub use crate::tensor::operations::{argsort, reorder};

/// Id of `__null__`, used to pad every batch
pub const PAD_TOKEN: i64 = 0;

/// A collated batch, sorted by `text_lens` descending
#[derive(Debug, Clone)]
pub struct Batch<T> {
    /// `(batch, max_text_len)` input ids
    pub text_vecs: T,
    pub text_lens: Vec<usize>,
    /// `(batch, max_target_len)` target ids, row `i` belongs to `text_vecs` row `i`
    pub target_vecs: T,
    pub target_lens: Vec<usize>,
    /// Rows are sorted for a packed encoder
    pub use_packed: bool,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.text_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text_lens.is_empty()
    }
}

/// Pads sequences into a single `(rows, max_len)` token tensor.
///
/// # Parameters
///
/// * `sequences` - The token id sequences, one per row
/// * `pad_token` - Id written after the end of each shorter sequence
/// * `device` - Device to build the tensor on
///
/// # Returns
///
/// The padded tensor and the unpadded length of every row.
pub fn pad_tensor<T, S>(sequences: &[S], pad_token: i64, device: &T::Device) -> Result<(T, Vec<usize>)>
where
    T: TokenTensor,
    S: AsRef<[i64]>,
{
    let (ids, max_len, lengths) = pad_rows(sequences, pad_token)?;
    let tensor = T::from_ids(ids, sequences.len(), max_len, device)?;
    Ok((tensor, lengths))
}

/// Collates `(text_vec, target_vec)` pairs into a [`Batch`].
///
/// Inputs and targets are padded separately, then all four outputs are
/// reordered by input length, descending.
pub fn batchify<T, S>(samples: &[(S, S)], device: &T::Device) -> Result<Batch<T>>
where
    T: TokenTensor,
    S: AsRef<[i64]>,
{
    let inputs: Vec<&[i64]> = samples.iter().map(|(text, _)| text.as_ref()).collect();
    let labels: Vec<&[i64]> = samples.iter().map(|(_, target)| target.as_ref()).collect();

    let (input_vecs, input_lens) = pad_tensor::<T, _>(&inputs, PAD_TOKEN, device)?;
    let (label_vecs, label_lens) = pad_tensor::<T, _>(&labels, PAD_TOKEN, device)?;

    // sort only wrt inputs here for encoder packing
    let order = argsort(&input_lens, true);

    Ok(Batch {
        text_vecs: input_vecs.index_select(BATCH_DIM, &order)?,
        text_lens: reorder(&input_lens, &order),
        target_vecs: label_vecs.index_select(BATCH_DIM, &order)?,
        target_lens: reorder(&label_lens, &order),
        use_packed: true,
    })
}
