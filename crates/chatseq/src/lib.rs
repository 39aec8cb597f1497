//! # chatseq
//!
//! Data marshalling for sequence-to-sequence chat models: vocabulary lookup,
//! dataset loading, batch padding and sorting, and the bookkeeping around
//! beam search.
//!
//! ## Overview
//!
//! A typical pipeline:
//!
//! 1. Load a [`ChatDictionary`](dictionary::ChatDictionary) from a
//!    `word<TAB>count` file.
//! 2. Load a [`ChatDataset`](dataset::ChatDataset) from JSON lines, tokenizing
//!    and vectorising each example.
//! 3. Collate examples into padded, length-sorted
//!    [`Batch`](batch::Batch)es, directly with [`batch::batchify`] or in the
//!    background with a [`BatchLoader`](loader::BatchLoader).
//! 4. Decode with [`generate::beam_search`], which keeps one
//!    [`Beam`](beam::Beam) per example and reorders encoder and decoder state
//!    with the helpers in [`state`].
//!
//! ## Architecture
//!
//! ### Assumptions
//! Regardless of backend used, chatseq reserves dimensions with special meanings:
//!  - The `0th` dimension of token batches, encoder outputs and masks is the batch dimension
//!  - The `1st` dimension of token batches is the sequence dimension
//!  - Recurrent hidden states are `(layers, batch, hidden)`, so their batch dimension is the `1st`
//!
//! ### Backend Traits
//!
//! The [`Backend`](backend::Backend) and [`TokenTensor`](backend::TokenTensor)
//! traits define what any tensor implementation must provide. Everything else
//! in the crate is written against them.
//!
//! ## Features
//!
//! - **candle** - Enables candle backend
//! - **burn** - Enables burn backend

pub mod backend;
pub mod batch;
pub mod beam;
pub mod config;
pub mod dataset;
pub mod dictionary;
pub mod generate;
pub mod loader;
pub mod state;
pub mod tokenize;
mod tensor;

/// Constants for client reference
pub use tensor::constant;
