//! # Beam State Reordering
//!
//! During beam search every row of the decoder batch is one hypothesis. Each
//! step the beams pick their best continuations, which may come from any row,
//! so the recurrent state must follow: row `i` of the new state is row
//! `indices[i]` of the old one.
//!
//! Encoder outputs and attention masks are laid out `(batch, ...)`; hidden and
//! cell states are `(layers, batch, hidden)`.

use anyhow::Result;
use crate::backend::Backend;
use crate::tensor::constant::{BATCH_DIM, HIDDEN_BATCH_DIM};

/// Final hidden state of a recurrent encoder
#[derive(Debug, Clone)]
pub enum HiddenState<S> {
    /// GRU or vanilla RNN
    Rnn(S),
    /// LSTM hidden and cell state
    Lstm(S, S),
}

impl<S> HiddenState<S>
where S: Backend
{
    pub fn hidden(&self) -> &S {
        match self {
            HiddenState::Rnn(hid) => hid,
            HiddenState::Lstm(hid, _) => hid,
        }
    }

    pub fn cell(&self) -> Option<&S> {
        match self {
            HiddenState::Rnn(_) => None,
            HiddenState::Lstm(_, cell) => Some(cell),
        }
    }
}

/// Everything the decoder reads from the encoder
#[derive(Debug, Clone)]
pub struct EncoderStates<S> {
    /// `(batch, seq, hidden)`
    pub enc_out: S,
    pub hidden: HiddenState<S>,
    /// `(batch, seq)`
    pub attention_mask: S,
}

/// Decoder state carried between steps: a tensor, or a nest of them
#[derive(Debug, Clone)]
pub enum IncrementalState<S> {
    Tensor(S),
    Tuple(Vec<IncrementalState<S>>),
}

/// Reorders encoder states according to a new set of indices.
///
/// Also used to expand a batch into beams by repeating indices.
pub fn reorder_encoder_states<S>(encoder_states: &EncoderStates<S>, indices: &[usize]) -> Result<EncoderStates<S>>
where S: Backend
{
    let hidden = match &encoder_states.hidden {
        HiddenState::Rnn(hid) => HiddenState::Rnn(hid.index_select(HIDDEN_BATCH_DIM, indices)?),
        HiddenState::Lstm(hid, cell) => HiddenState::Lstm(
            hid.index_select(HIDDEN_BATCH_DIM, indices)?,
            cell.index_select(HIDDEN_BATCH_DIM, indices)?,
        ),
    };

    Ok(EncoderStates {
        enc_out: encoder_states.enc_out.index_select(BATCH_DIM, indices)?,
        hidden,
        attention_mask: encoder_states.attention_mask.index_select(BATCH_DIM, indices)?,
    })
}

/// Reorders the decoder's incremental state, recursing into tuples.
pub fn reorder_decoder_incremental_state<S>(incremental_state: &IncrementalState<S>, indices: &[usize]) -> Result<IncrementalState<S>>
where S: Backend
{
    match incremental_state {
        // gru or lstm
        IncrementalState::Tensor(state) => Ok(IncrementalState::Tensor(state.index_select(HIDDEN_BATCH_DIM, indices)?)),
        IncrementalState::Tuple(states) => states.iter()
            .map(|state| reorder_decoder_incremental_state(state, indices))
            .collect::<Result<Vec<_>>>()
            .map(IncrementalState::Tuple),
    }
}
