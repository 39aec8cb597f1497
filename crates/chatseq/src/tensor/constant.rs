/// # Constants with reserved meanings in chatseq

/// In a token batch, encoder output or attention mask, the `0th` dimension is the batch
pub const BATCH_DIM: usize = 0;

/// In a token batch, the `1st` dimension is the sequence
pub const SEQ_DIM: usize = 1;

/// Recurrent hidden and cell states are laid out `(layers, batch, hidden)`
pub const HIDDEN_BATCH_DIM: usize = 1;
