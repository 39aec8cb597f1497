//! # Batch Loader
//!
//! Walks a [`ChatDataset`] in batches, collating each one with
//! [`batchify`](crate::batch::batchify).
//!
//! Batches are produced by a background Tokio task and consumed through an
//! [`ItemStream`], so collation of the next batch overlaps with whatever the
//! consumer does with the current one.
//!
//! # Example
//!
//! With the `candle` feature enabled:
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatseq::{
//!     config::LoaderConfig,
//!     dataset::{ChatDataset, ChatSample},
//!     loader::BatchLoader,
//! };
//! use candle_core::{Device, Tensor};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let sample = |text: Vec<i64>, target: Vec<i64>| ChatSample {
//!     text: String::new(),
//!     target: String::new(),
//!     episode_done: false,
//!     text_vec: text,
//!     target_vec: target,
//!     extra: Default::default(),
//! };
//! let dataset = ChatDataset::from_samples(vec![
//!     sample(vec![4, 5], vec![6, 2]),
//!     sample(vec![7], vec![2]),
//!     sample(vec![4, 5, 7], vec![2]),
//! ]);
//!
//! let config = LoaderConfig { batch_size: 2, ..Default::default() };
//! let mut loader = BatchLoader::<Tensor>::new(Arc::new(dataset), config, Device::Cpu)?;
//!
//! let mut batches = loader.stream();
//! while let Some(batch) = batches.next().await {
//!     let batch = batch?;
//!     println!("batch of {} with lengths {:?}", batch.len(), batch.text_lens);
//! }
//! # Ok(())
//! # }
//! ```

mod item_stream;

use std::sync::Arc;
use anyhow::{ensure, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::mpsc;
use crate::backend::TokenTensor;
use crate::batch::{batchify, Batch};
use crate::config::LoaderConfig;
use crate::dataset::ChatDataset;

pub use item_stream::ItemStream;

/// Batches a shared dataset, one epoch per call to [`stream`](Self::stream)
pub struct BatchLoader<T>
where T: TokenTensor
{
    dataset: Arc<ChatDataset>,
    config: LoaderConfig,
    device: T::Device,
    rng: StdRng,
}

impl<T> BatchLoader<T>
where T: TokenTensor
{
    pub fn new(dataset: Arc<ChatDataset>, config: LoaderConfig, device: T::Device) -> Result<Self> {
        ensure!(config.batch_size > 0, "batch_size must be at least 1");
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            dataset,
            config,
            device,
            rng,
        })
    }

    /// Number of batches in one epoch; the last one may be short
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.config.batch_size)
    }

    /// Sample order for the next epoch
    fn epoch_order(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.config.shuffle {
            order.shuffle(&mut self.rng);
        }
        order
    }

    /// Collates the batches of one epoch without a runtime
    pub fn batches(&mut self) -> impl Iterator<Item = Result<Batch<T>>> + '_ {
        let order = self.epoch_order();
        let batch_size = self.config.batch_size;
        let dataset = self.dataset.clone();
        let device = self.device.clone();

        (0..order.len().div_ceil(batch_size)).map(move |n| {
            let end = usize::min((n + 1) * batch_size, order.len());
            collate::<T>(&dataset, &order[n * batch_size..end], &device)
        })
    }

    /// Starts collating one epoch in the background.
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// stream stops the producer.
    pub fn stream(&mut self) -> ItemStream<Result<Batch<T>>> {
        let order = self.epoch_order();
        let batch_size = self.config.batch_size;
        let dataset = self.dataset.clone();
        let device = self.device.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let producer = tokio::spawn(async move {
            let mut sent = 0;
            for chunk in order.chunks(batch_size) {
                let batch = collate::<T>(&dataset, chunk, &device);
                if tx.send(batch).is_err() {
                    tracing::debug!("batch stream dropped after {} batches", sent);
                    return;
                }
                sent += 1;
                tokio::task::yield_now().await;
            }
            tracing::debug!("batch stream finished after {} batches", sent);
        });

        ItemStream::new(rx, producer)
    }
}

fn collate<T>(dataset: &ChatDataset, indices: &[usize], device: &T::Device) -> Result<Batch<T>>
where T: TokenTensor
{
    let samples: Vec<(&[i64], &[i64])> = indices.iter()
        .filter_map(|&i| dataset.get(i))
        .collect();
    batchify(&samples, device)
}
