use anyhow::Result;
use async_trait::async_trait;
use crate::backend::{Backend, TokenTensor};
use crate::state::{EncoderStates, IncrementalState};

/// # Seq2Seq
///
/// A trait for encoder/decoder models that can be driven by
/// [`beam_search`](super::beam_search).
///
/// ## Input/Output Dimensions
///
/// - `encode` receives the `(batch, seq)` padded input ids of a
///   [`Batch`](crate::batch::Batch), sorted by length for packing, and returns
///   the encoder states for each row.
/// - `decode_step` receives `(rows, 1)` ids, the last token of every live
///   hypothesis, and returns one row of vocabulary log-probabilities per input
///   row, together with the decoder state to carry into the next step.
///
/// Between steps, both the encoder states and the incremental state are
/// reordered so that row `i` always belongs to hypothesis `i` of its beam.
#[async_trait]
pub trait Seq2Seq: Send + Sync {
    /// Integer tensor type of token ids
    type Tokens: TokenTensor;

    /// Floating tensor type of hidden states
    type State: Backend;

    /// Runs the encoder over a padded batch
    async fn encode(
        &self,
        text_vecs: &Self::Tokens,
        text_lens: &[usize],
    ) -> Result<EncoderStates<Self::State>>;

    /// Runs the decoder for one token
    ///
    /// `incremental_state` is `None` on the first step.
    async fn decode_step(
        &self,
        tokens: &Self::Tokens,
        encoder_states: &EncoderStates<Self::State>,
        incremental_state: Option<&IncrementalState<Self::State>>,
    ) -> Result<(Vec<Vec<f32>>, IncrementalState<Self::State>)>;
}
