//! # Beam Search Generation
//!
//! Drives a [`Seq2Seq`] model with one [`Beam`] per example, using the state
//! reordering helpers to keep the model's rows aligned with the beams.
//!
//! ## Implementation Details
//!
//! The encoder runs once over the batch. Its states are then expanded so that
//! every example occupies `beam_size` consecutive rows. Each step, the decoder
//! scores the last token of every row, every unfinished beam advances on its
//! own rows, and the incremental state is reordered by the beams'
//! back-pointers. Beams that are already done keep their rows in place.
//! Decoding stops when every beam is done or after `max_len` steps.

mod core_trait;

use anyhow::{ensure, Result};
use crate::backend::{Backend, TokenTensor};
use crate::batch::Batch;
use crate::beam::{get_nbest_list_from_beam, Beam, SpecialTokens};
use crate::config::GenerationConfig;
use crate::dictionary::ChatDictionary;
use crate::state::{reorder_decoder_incremental_state, reorder_encoder_states};
use crate::tensor::operations::repeat_interleave;

pub use core_trait::Seq2Seq;

/// Runs beam search over every example of `batch`, returning one [`Beam`] per row.
pub async fn beam_search<M>(
    model: &M,
    batch: &Batch<M::Tokens>,
    config: &GenerationConfig,
    tokens: SpecialTokens,
) -> Result<Vec<Beam>>
where M: Seq2Seq
{
    config.validate()?;
    let bsz = batch.len();
    let beam_size = config.beam.beam_size;
    let rows = bsz * beam_size;
    let device = batch.text_vecs.device();

    let encoder_states = model.encode(&batch.text_vecs, &batch.text_lens).await?;
    let encoder_states = reorder_encoder_states(&encoder_states, &repeat_interleave(bsz, beam_size))?;

    let mut beams: Vec<Beam> = (0..bsz)
        .map(|_| Beam::new(config.beam.clone(), tokens))
        .collect::<Result<_>>()?;
    let mut decoder_input = M::Tokens::from_ids(vec![tokens.bos; rows], rows, 1, &device)?;
    let mut incr_state = None;

    for step in 0..config.max_len {
        let (scores, new_state) = model
            .decode_step(&decoder_input, &encoder_states, incr_state.as_ref())
            .await?;
        ensure!(
            scores.len() == rows,
            "decoder returned {} rows of scores for {} hypotheses", scores.len(), rows
        );

        let mut incr_state_inds = Vec::with_capacity(rows);
        for (i, beam) in beams.iter_mut().enumerate() {
            let offset = i * beam_size;
            if beam.done() {
                incr_state_inds.extend(offset..offset + beam_size);
                continue;
            }
            beam.advance(&scores[offset..offset + beam_size])?;
            incr_state_inds.extend(beam.backtrack_from_current_step().into_iter().map(|hyp| offset + hyp));
        }

        if beams.iter().all(Beam::done) {
            tracing::debug!("all {} beams done after {} steps", bsz, step + 1);
            break;
        }

        incr_state = Some(reorder_decoder_incremental_state(&new_state, &incr_state_inds)?);
        let next_tokens: Vec<i64> = beams.iter()
            .flat_map(|beam| beam.output_from_current_step().iter().copied())
            .collect();
        decoder_input = M::Tokens::from_ids(next_tokens, rows, 1, &device)?;
    }

    Ok(beams)
}

/// Runs [`beam_search`] and renders the n-best list of every example as text.
pub async fn generate_nbest<M>(
    model: &M,
    batch: &Batch<M::Tokens>,
    config: &GenerationConfig,
    dictionary: &ChatDictionary,
) -> Result<Vec<Vec<(String, f32)>>>
where M: Seq2Seq
{
    let tokens = SpecialTokens::from_dictionary(dictionary)?;
    let beams = beam_search(model, batch, config, tokens).await?;
    beams.iter()
        .map(|beam| get_nbest_list_from_beam(beam, dictionary, config.n_best, config.add_length_penalty))
        .collect()
}
