use anyhow::{bail, Result};

/// Validates that `indices` can be gathered from dimension `dim` of `shape`.
///
/// Backends differ in how they treat an out-of-range index (some panic, some
/// return garbage), so every `index_select` goes through this check first.
pub(crate) fn check_indices(shape: &[usize], dim: usize, indices: &[usize]) -> Result<()> {
    if dim >= shape.len() {
        bail!("dimension {} is out of range for shape {:?}", dim, shape);
    }
    let size = shape[dim];
    if let Some(bad) = indices.iter().find(|&&i| i >= size) {
        bail!("index {} is out of bounds for dimension {} with size {}", bad, dim, size);
    }
    Ok(())
}

/// Right-pads variable length sequences into one dense row-major buffer.
///
/// # Parameters
///
/// * `sequences` - The sequences to lay out as rows
/// * `pad_token` - Value written after the end of each shorter row
///
/// # Returns
///
/// The buffer of `rows * max_len` ids, the row width `max_len`, and the original
/// length of each row.
pub(crate) fn pad_rows<S>(sequences: &[S], pad_token: i64) -> Result<(Vec<i64>, usize, Vec<usize>)>
where S: AsRef<[i64]>
{
    if sequences.is_empty() {
        bail!("cannot pad an empty list of sequences");
    }
    let lengths: Vec<usize> = sequences.iter().map(|s| s.as_ref().len()).collect();
    let max_len = lengths.iter().copied().max().unwrap_or(0);

    let mut ids = vec![pad_token; sequences.len() * max_len];
    for (row, sequence) in sequences.iter().enumerate() {
        let sequence = sequence.as_ref();
        let start = row * max_len;
        ids[start..start + sequence.len()].copy_from_slice(sequence);
    }
    Ok((ids, max_len, lengths))
}

/// Returns the order that sorts `keys`.
///
/// The sort is stable and ascending. With `descending`, that ascending order is
/// reversed as a whole, so equal keys come out in reverse insertion order.
pub fn argsort<K>(keys: &[K], descending: bool) -> Vec<usize>
where K: Ord
{
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    if descending {
        order.reverse();
    }
    order
}

/// Reorders a slice by an order produced by [`argsort`].
pub fn reorder<T>(items: &[T], order: &[usize]) -> Vec<T>
where T: Clone
{
    order.iter().map(|&i| items[i].clone()).collect()
}

/// `[0, 0, .., 1, 1, ..]`: each of `n` indices repeated `times` times in place.
pub(crate) fn repeat_interleave(n: usize, times: usize) -> Vec<usize> {
    (0..n).flat_map(|i| std::iter::repeat_n(i, times)).collect()
}
