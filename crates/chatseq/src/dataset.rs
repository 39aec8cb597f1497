//! # Chat Dataset
//!
//! Loads dialogue examples from a JSON lines file and vectorises them with a
//! [`ChatDictionary`].
//!
//! Each line is an object with a `text` field and a target: `labels` in the
//! training split and `eval_labels` in the validation split. Only the first
//! label is used. Targets are terminated with `__end__`.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use crate::dictionary::{ChatDictionary, END_TOKEN};
use crate::tokenize::tokenize;

const PROGRESS_EVERY: usize = 10_000;

/// Which file a dataset comes from; decides where the target text is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Valid,
}

impl Split {
    fn label_key(&self) -> &'static str {
        match self {
            Split::Train => "labels",
            Split::Valid => "eval_labels",
        }
    }
}

impl FromStr for Split {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Split::Train),
            "valid" => Ok(Split::Valid),
            other => Err(anyhow!("unknown split {:?}, expected \"train\" or \"valid\"", other)),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Valid => write!(f, "valid"),
        }
    }
}

#[derive(Deserialize)]
struct RawSample {
    text: String,
    #[serde(default)]
    episode_done: bool,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// One vectorised example
#[derive(Debug, Clone)]
pub struct ChatSample {
    pub text: String,
    pub target: String,
    pub episode_done: bool,
    pub text_vec: Vec<i64>,
    pub target_vec: Vec<i64>,
    /// Every other field of the source line, including the label lists
    pub extra: Map<String, Value>,
}

/// Vectorised examples, in file order
#[derive(Debug, Clone)]
pub struct ChatDataset {
    samples: Vec<ChatSample>,
}

impl ChatDataset {
    /// Reads and vectorises every line of a JSON lines file
    pub fn load(path: impl AsRef<Path>, dictionary: &ChatDictionary, split: Split) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("cannot read dataset '{}'", path.display()))?;

        let mut samples = Vec::new();
        for (i, line) in raw.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let sample = parse_sample(line, dictionary, split)
                .with_context(|| format!("'{}' line {}", path.display(), i + 1))?;
            samples.push(sample);

            if (i + 1) % PROGRESS_EVERY == 0 {
                tracing::debug!("vectorised {} lines of '{}'", i + 1, path.display());
            }
        }

        tracing::info!("loaded {} {} samples from '{}'", samples.len(), split, path.display());
        Ok(Self { samples })
    }

    pub fn from_samples(samples: Vec<ChatSample>) -> Self {
        Self { samples }
    }

    /// The `(text_vec, target_vec)` pair of sample `i`
    pub fn get(&self, i: usize) -> Option<(&[i64], &[i64])> {
        self.samples.get(i).map(|s| (s.text_vec.as_slice(), s.target_vec.as_slice()))
    }

    pub fn sample(&self, i: usize) -> Option<&ChatSample> {
        self.samples.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

pub(crate) fn parse_sample(line: &str, dictionary: &ChatDictionary, split: Split) -> Result<ChatSample> {
    let raw: RawSample = serde_json::from_str(line).context("invalid JSON sample")?;

    let key = split.label_key();
    let target = match raw.rest.get(key) {
        Some(Value::Array(labels)) => match labels.first() {
            Some(Value::String(label)) => label.clone(),
            Some(other) => bail!("first entry of `{}` is not a string: {}", key, other),
            None => bail!("`{}` is empty", key),
        },
        Some(other) => bail!("`{}` is not a list: {}", key, other),
        None => bail!("missing `{}`", key),
    };

    let text_vec = dictionary.t2v(&tokenize(&raw.text))?;
    let mut target_tokens = tokenize(&target);
    target_tokens.push(END_TOKEN);
    let target_vec = dictionary.t2v(&target_tokens)?;

    Ok(ChatSample {
        text: raw.text,
        target,
        episode_done: raw.episode_done,
        text_vec,
        target_vec,
        extra: raw.rest,
    })
}
