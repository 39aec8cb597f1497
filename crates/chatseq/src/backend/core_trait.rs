use std::fmt::Debug;
use anyhow::Result;

/// The backend trait that must be fulfilled by any tensor carried through the
/// batching and beam helpers
pub trait Backend: Debug + Clone + Send + Sync + 'static {
    /// The device a tensor lives on
    type Device: Clone + Send + Sync + 'static;

    /// Return the shape of this tensor
    fn shape(&self) -> Vec<usize>;

    /// Return the device of this tensor
    fn device(&self) -> Self::Device;

    /// Gather the slices of dimension `dim` at `indices`, in the order supplied.
    /// Indices may repeat, which is how a batch is expanded into beams.
    fn index_select(&self, dim: usize, indices: &[usize]) -> Result<Self>;
}

/// A rank `2` integer tensor of token ids, laid out `(batch, seq)`
pub trait TokenTensor: Backend {
    /// Build a `(rows, cols)` tensor from row-major `ids`
    fn from_ids(ids: Vec<i64>, rows: usize, cols: usize, device: &Self::Device) -> Result<Self>;

    /// Flatten the tensor back into row-major ids
    fn to_ids(&self) -> Result<Vec<i64>>;
}
