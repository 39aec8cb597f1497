//! # Beam Bookkeeping
//!
//! A [`Beam`] tracks the hypotheses of a single example during beam search.
//! It never sees tensors: each step it is handed one row of vocabulary
//! log-probabilities per live hypothesis, and it records which token each new
//! hypothesis appended and which old hypothesis it extends. Those back-pointers
//! are what the decoder state is reordered with, and what finished hypotheses
//! are reconstructed from.

use anyhow::{ensure, Context, Result};
use crate::config::BeamConfig;
use crate::dictionary::{ChatDictionary, END_TOKEN, NULL_TOKEN, START_TOKEN};

/// Ids of the tokens a beam treats specially
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad: i64,
    pub bos: i64,
    pub eos: i64,
}

impl SpecialTokens {
    pub fn from_dictionary(dictionary: &ChatDictionary) -> Result<Self> {
        let id = |word: &str| dictionary.index_of(word)
            .with_context(|| format!("dictionary has no {}", word));
        Ok(Self {
            pad: id(NULL_TOKEN)?,
            bos: id(START_TOKEN)?,
            eos: id(END_TOKEN)?,
        })
    }
}

/// Hold some bookkeeping about a hypothesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HypothesisTail {
    pub timestep: usize,
    pub hypid: usize,
    pub score: f32,
    pub tokenid: i64,
}

#[derive(Debug, Clone)]
pub struct Beam {
    config: BeamConfig,
    tokens: SpecialTokens,
    /// Running score of each live hypothesis
    scores: Vec<f32>,
    /// `scores` at every timestep, starting with zeros
    all_scores: Vec<Vec<f32>>,
    /// For each step, the hypothesis each new hypothesis extends
    bookkeep: Vec<Vec<usize>>,
    /// For each timestep, the token each hypothesis ends with, starting with `bos`
    outputs: Vec<Vec<i64>>,
    finished: Vec<HypothesisTail>,
    eos_top: bool,
    eos_top_ts: Option<usize>,
    n_best_counter: usize,
    partial_hyps: Vec<Vec<i64>>,
}

impl Beam {
    pub fn new(config: BeamConfig, tokens: SpecialTokens) -> Result<Self> {
        config.validate()?;
        let beam_size = config.beam_size;
        Ok(Self {
            config,
            tokens,
            scores: vec![0.0; beam_size],
            all_scores: vec![vec![0.0; beam_size]],
            bookkeep: vec![],
            outputs: vec![vec![tokens.bos; beam_size]],
            finished: vec![],
            eos_top: false,
            eos_top_ts: None,
            n_best_counter: 0,
            partial_hyps: vec![vec![tokens.bos]; beam_size],
        })
    }

    pub fn beam_size(&self) -> usize {
        self.config.beam_size
    }

    pub fn min_n_best(&self) -> usize {
        self.config.min_n_best
    }

    /// Tokens appended at the latest step, one per hypothesis
    pub fn output_from_current_step(&self) -> &[i64] {
        self.outputs.last().map(Vec::as_slice).unwrap_or_default()
    }

    /// Which previous hypothesis each current one extends; identity before the first step
    pub fn backtrack_from_current_step(&self) -> Vec<usize> {
        match self.bookkeep.last() {
            Some(backtrack) => backtrack.clone(),
            None => (0..self.config.beam_size).collect(),
        }
    }

    pub fn partial_hyps(&self) -> &[Vec<i64>] {
        &self.partial_hyps
    }

    pub fn finished(&self) -> &[HypothesisTail] {
        &self.finished
    }

    /// Timestep at which the best hypothesis first ended, if it has
    pub fn eos_top_timestep(&self) -> Option<usize> {
        self.eos_top_ts
    }

    /// Done once the best hypothesis has ended and enough others have too
    pub fn done(&self) -> bool {
        self.eos_top && self.n_best_counter >= self.config.min_n_best
    }

    /// Extends the beam by one token.
    ///
    /// # Parameters
    ///
    /// * `log_probs` - One row of vocabulary log-probabilities per hypothesis.
    ///   On the first step only row `0` is read, since every hypothesis is
    ///   still just `bos`.
    pub fn advance<R>(&mut self, log_probs: &[R]) -> Result<()>
    where R: AsRef<[f32]>
    {
        let beam_size = self.config.beam_size;
        let first_step = self.bookkeep.is_empty();
        let rows = if first_step { 1 } else { beam_size };
        ensure!(
            log_probs.len() >= rows,
            "expected {} rows of scores, got {}", rows, log_probs.len()
        );

        let voc_size = log_probs[0].as_ref().len();
        ensure!(voc_size >= beam_size, "vocabulary of {} cannot fill a beam of {}", voc_size, beam_size);
        ensure!(
            log_probs[..rows].iter().all(|row| row.as_ref().len() == voc_size),
            "score rows have different vocabulary sizes"
        );
        let eos = usize::try_from(self.tokens.eos).ok().filter(|&eos| eos < voc_size)
            .with_context(|| format!("end token {} is outside the vocabulary", self.tokens.eos))?;

        let current_length = self.all_scores.len() - 1;
        let last_outputs = self.output_from_current_step().to_vec();

        let mut beam_scores: Vec<f32> = Vec::with_capacity(rows * voc_size);
        for (hyp_id, row) in log_probs[..rows].iter().enumerate() {
            let row = row.as_ref();
            if !first_step && last_outputs[hyp_id] == self.tokens.eos {
                // finished hypotheses are not extended
                beam_scores.extend(std::iter::repeat_n(f32::NEG_INFINITY, voc_size));
                continue;
            }
            let offset = if first_step { 0.0 } else { self.scores[hyp_id] };
            let start = beam_scores.len();
            // a diverged row must never outrank a real score
            beam_scores.extend(row.iter().map(|&score| if score.is_nan() { f32::NEG_INFINITY } else { score + offset }));
            if current_length < self.config.min_length {
                beam_scores[start + eos] = f32::NEG_INFINITY;
            }
        }

        let mut best_idxs: Vec<usize> = (0..beam_scores.len()).collect();
        best_idxs.sort_by(|&a, &b| beam_scores[b].total_cmp(&beam_scores[a]));
        best_idxs.truncate(beam_size);

        let best_scores: Vec<f32> = best_idxs.iter().map(|&i| beam_scores[i]).collect();
        let hyp_ids: Vec<usize> = best_idxs.iter().map(|&i| i / voc_size).collect();
        let tok_ids: Vec<i64> = best_idxs.iter().map(|&i| (i % voc_size) as i64).collect();

        self.partial_hyps = hyp_ids.iter().zip(&tok_ids)
            .map(|(&hyp_id, &tok)| {
                let mut hyp = self.partial_hyps[hyp_id].clone();
                hyp.push(tok);
                hyp
            })
            .collect();
        self.scores = best_scores.clone();
        self.all_scores.push(best_scores);
        self.outputs.push(tok_ids);
        self.bookkeep.push(hyp_ids);

        // check new hypos for eos label, if we have some, add to finished
        let timestep = self.outputs.len() - 1;
        for hypid in 0..beam_size {
            if self.outputs[timestep][hypid] == self.tokens.eos {
                self.finished.push(HypothesisTail {
                    timestep,
                    hypid,
                    score: self.scores[hypid],
                    tokenid: self.tokens.eos,
                });
                self.n_best_counter += 1;
            }
        }

        if self.outputs[timestep][0] == self.tokens.eos {
            self.eos_top = true;
            self.eos_top_ts.get_or_insert(timestep);
        }

        Ok(())
    }

    /// Walks back-pointers from a finished tail; the path is returned last token first.
    ///
    /// A tail whose timestep or hypothesis id this beam never produced is an error.
    pub fn hyp_from_finished(&self, hypothesis_tail: &HypothesisTail) -> Result<Vec<HypothesisTail>> {
        ensure!(
            hypothesis_tail.timestep < self.outputs.len() && hypothesis_tail.hypid < self.config.beam_size,
            "hypothesis {} at step {} is not in a beam of {} after {} steps",
            hypothesis_tail.hypid, hypothesis_tail.timestep, self.config.beam_size, self.outputs.len() - 1
        );
        let mut hyp_idx = Vec::with_capacity(hypothesis_tail.timestep + 1);
        let mut endback = hypothesis_tail.hypid;
        for i in (0..=hypothesis_tail.timestep).rev() {
            hyp_idx.push(HypothesisTail {
                timestep: i,
                hypid: endback,
                score: self.all_scores[i][endback],
                tokenid: self.outputs[i][endback],
            });
            if i > 0 {
                endback = self.bookkeep[i - 1][endback];
            }
        }
        Ok(hyp_idx)
    }

    /// Token ids of a path from [`hyp_from_finished`](Self::hyp_from_finished), in order
    pub fn pretty_hypothesis(list_of_hypotails: &[HypothesisTail]) -> Vec<i64> {
        list_of_hypotails.iter().rev().map(|tail| tail.tokenid).collect()
    }

    /// Finished hypotheses as `(token_ids, score)`, best first.
    ///
    /// If nothing has finished, the best live hypothesis stands in. With
    /// `add_length_penalty`, scores are divided by `((1 + len) / 6) ^ 0.65`.
    pub fn rescored_finished(&self, n_best: Option<usize>, add_length_penalty: bool) -> Result<Vec<(Vec<i64>, f32)>> {
        let mut finished = self.finished.clone();
        if finished.is_empty() {
            // no hyps reached eos; add top hypothesis
            let timestep = self.outputs.len() - 1;
            let score = self.all_scores.get(timestep)
                .and_then(|scores| scores.first())
                .copied()
                .context("beam has no hypotheses")?;
            finished.push(HypothesisTail {
                timestep,
                hypid: 0,
                score,
                tokenid: self.tokens.eos,
            });
        }

        let mut rescored: Vec<HypothesisTail> = finished.into_iter()
            .map(|tail| {
                let length_penalty = if add_length_penalty {
                    let current_length = (tail.timestep + 1) as f32;
                    ((1.0 + current_length) / 6.0).powf(0.65)
                } else {
                    1.0
                };
                HypothesisTail { score: tail.score / length_penalty, ..tail }
            })
            .collect();
        rescored.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(n_best) = n_best {
            rescored.truncate(n_best);
        }

        rescored.iter()
            .map(|tail| Ok((Self::pretty_hypothesis(&self.hyp_from_finished(tail)?), tail.score)))
            .collect()
    }

    /// The single best hypothesis, without length penalty
    pub fn top_hyp(&self) -> Result<(Vec<i64>, f32)> {
        self.rescored_finished(Some(1), false)?
            .into_iter()
            .next()
            .context("beam has no hypotheses")
    }
}

/// The `n_best` finished hypotheses of `beam` as `(text, score)`.
///
/// `n_best` defaults to the beam's `min_n_best`.
pub fn get_nbest_list_from_beam(
    beam: &Beam,
    dictionary: &ChatDictionary,
    n_best: Option<usize>,
    add_length_penalty: bool,
) -> Result<Vec<(String, f32)>> {
    let n_best = n_best.unwrap_or(beam.min_n_best());
    beam.rescored_finished(Some(n_best), add_length_penalty)?
        .into_iter()
        .map(|(ids, score)| Ok((dictionary.v2t(&ids)?, score)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // __null__ 0, __start__ 1, __end__ 2, a 3, b 4
    const NEG: f32 = -9.0;

    fn dictionary() -> ChatDictionary {
        ChatDictionary::from_words([
            ("__null__", 0), ("__start__", 0), ("__end__", 0), ("a", 2), ("b", 1),
        ])
    }

    fn beam(beam_size: usize, min_length: usize, min_n_best: usize) -> Beam {
        let tokens = SpecialTokens::from_dictionary(&dictionary()).unwrap();
        Beam::new(BeamConfig { beam_size, min_length, min_n_best }, tokens).unwrap()
    }

    // three steps ending two hypotheses: "a __end__" at t2 (-1.9) and "b a __end__" at t3 (-2.15)
    fn advanced_beam() -> Beam {
        let mut beam = beam(2, 0, 2);
        beam.advance(&[vec![NEG, NEG, -3.0, -1.0, -2.0], vec![0.0; 5]]).unwrap();
        beam.advance(&[
            vec![NEG, NEG, -0.9, -3.0, -3.0],
            vec![NEG, NEG, -4.0, -0.1, -5.0],
        ]).unwrap();
        beam.advance(&[
            vec![0.0, 0.0, 0.0, 0.0, 0.0],
            vec![NEG, NEG, -0.05, -1.0, -3.0],
        ]).unwrap();
        beam
    }

    #[test]
    fn test_first_step_only_expands_first_row() {
        let mut beam = beam(2, 0, 1);
        beam.advance(&[vec![NEG, NEG, -3.0, -1.0, -2.0], vec![0.0; 5]]).unwrap();

        assert_eq!(beam.output_from_current_step(), &[3, 4]);
        assert_eq!(beam.backtrack_from_current_step(), vec![0, 0]);
        assert_eq!(beam.partial_hyps(), &[vec![1, 3], vec![1, 4]]);
        assert!(beam.finished().is_empty());
    }

    #[test]
    fn test_backtrack_before_first_step_is_identity() {
        let beam = beam(3, 0, 1);
        assert_eq!(beam.backtrack_from_current_step(), vec![0, 1, 2]);
        assert_eq!(beam.output_from_current_step(), &[1, 1, 1]);
    }

    #[test]
    fn test_finished_hypotheses_are_recorded() {
        let beam = advanced_beam();

        assert_eq!(beam.finished().len(), 2);
        assert_eq!(beam.finished()[0].timestep, 2);
        assert_eq!(beam.finished()[1].timestep, 3);
        assert_eq!(beam.eos_top_timestep(), Some(2));
        assert!(beam.done());
        assert_eq!(beam.partial_hyps(), &[vec![1, 4, 3, 2], vec![1, 4, 3, 3]]);
    }

    #[test]
    fn test_finished_rows_are_not_extended() {
        let beam = advanced_beam();
        // both survivors of the last step extend hypothesis 1
        assert_eq!(beam.backtrack_from_current_step(), vec![1, 1]);
    }

    #[test]
    fn test_min_length_blocks_end() {
        let mut beam = beam(1, 2, 1);
        beam.advance(&[vec![NEG, NEG, 0.0, -1.0, -2.0]]).unwrap();
        assert_eq!(beam.output_from_current_step(), &[3]);
        beam.advance(&[vec![NEG, NEG, 0.0, -1.0, -2.0]]).unwrap();
        assert_eq!(beam.output_from_current_step(), &[3]);
        beam.advance(&[vec![NEG, NEG, 0.0, -1.0, -2.0]]).unwrap();
        assert_eq!(beam.output_from_current_step(), &[2]);
    }

    #[test]
    fn test_not_done_until_min_n_best() {
        let mut beam = beam(2, 0, 3);
        beam.advance(&[vec![NEG, NEG, -0.1, -1.0, -2.0]]).unwrap();
        assert!(beam.output_from_current_step()[0] == 2);
        assert!(!beam.done());
    }

    #[test]
    fn test_rescored_finished_without_penalty() {
        let beam = advanced_beam();
        let rescored = beam.rescored_finished(None, false).unwrap();

        assert_eq!(rescored.len(), 2);
        assert_eq!(rescored[0].0, vec![1, 3, 2]);
        assert!((rescored[0].1 + 1.9).abs() < 1e-5);
        assert_eq!(rescored[1].0, vec![1, 4, 3, 2]);
        assert!((rescored[1].1 + 2.15).abs() < 1e-5);
    }

    #[test]
    fn test_length_penalty_prefers_longer_hypothesis() {
        let beam = advanced_beam();
        let rescored = beam.rescored_finished(None, true).unwrap();

        assert_eq!(rescored[0].0, vec![1, 4, 3, 2]);
        let expected = -2.15 / (5.0f32 / 6.0).powf(0.65);
        assert!((rescored[0].1 - expected).abs() < 1e-4);
    }

    #[test]
    fn test_rescored_finished_truncates() {
        let beam = advanced_beam();
        assert_eq!(beam.rescored_finished(Some(1), false).unwrap().len(), 1);
    }

    #[test]
    fn test_nothing_finished_falls_back_to_top() {
        let mut beam = beam(2, 0, 1);
        beam.advance(&[vec![NEG, NEG, NEG, -1.0, -2.0]]).unwrap();
        let (ids, score) = beam.top_hyp().unwrap();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(score, -1.0);
    }

    #[test]
    fn test_advance_rejects_bad_rows() {
        let mut beam = beam(3, 0, 1);
        assert!(beam.advance(&[vec![0.0, 0.0]]).is_err());

        let mut beam = self::beam(2, 0, 1);
        beam.advance(&[vec![NEG, NEG, NEG, -1.0, -2.0]]).unwrap();
        assert!(beam.advance(&[vec![0.0; 5]]).is_err());
    }

    #[test]
    fn test_zero_beam_size_is_error() {
        let tokens = SpecialTokens::from_dictionary(&dictionary()).unwrap();
        let config = BeamConfig { beam_size: 0, min_length: 0, min_n_best: 1 };
        assert!(Beam::new(config, tokens).is_err());
    }

    #[test]
    fn test_nan_scores_rank_last() {
        let mut beam = beam(2, 0, 1);
        beam.advance(&[vec![f32::NAN, NEG, -3.0, -1.0, -2.0]]).unwrap();
        assert_eq!(beam.output_from_current_step(), &[3, 4]);

        let mut beam = self::beam(1, 0, 1);
        beam.advance(&[vec![NEG, NEG, NEG, f32::NAN, -2.0]]).unwrap();
        assert_eq!(beam.output_from_current_step(), &[4]);
    }

    #[test]
    fn test_foreign_tail_is_error() {
        let beam = advanced_beam();
        let tail = |timestep, hypid| HypothesisTail { timestep, hypid, score: 0.0, tokenid: 2 };
        assert!(beam.hyp_from_finished(&tail(4, 0)).is_err());
        assert!(beam.hyp_from_finished(&tail(1, 2)).is_err());
        assert_eq!(beam.hyp_from_finished(&tail(2, 0)).unwrap().len(), 3);
    }

    #[test]
    fn test_nbest_list_text() {
        let beam = advanced_beam();
        let nbest = get_nbest_list_from_beam(&beam, &dictionary(), None, false).unwrap();
        let texts: Vec<&str> = nbest.iter().map(|(text, _)| text.as_str()).collect();
        assert_eq!(texts, vec!["__start__ a __end__", "__start__ b a __end__"]);
    }
}
