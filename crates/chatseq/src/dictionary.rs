//! # Chat Dictionary
//!
//! Loads a vocabulary file and maps between tokens and ids.
//!
//! The file holds one `word<TAB>count` entry per line, and the line number is
//! the word's id. Newline tokens are written as the two characters `\n`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use anyhow::{bail, Context, Result};

/// Padding token
pub const NULL_TOKEN: &str = "__null__";
/// Start of a decoded sequence
pub const START_TOKEN: &str = "__start__";
/// End of a target or decoded sequence
pub const END_TOKEN: &str = "__end__";
/// Replacement for out of vocabulary words
pub const UNK_TOKEN: &str = "__unk__";

const ESCAPED_NEWLINE: &str = "\\n";

/// Vocabulary with word/id lookups in both directions
#[derive(Debug, Clone, Default)]
pub struct ChatDictionary {
    word2ind: HashMap<String, i64>,
    ind2word: HashMap<i64, String>,
    counts: HashMap<String, u64>,
}

impl ChatDictionary {
    /// Reads a dictionary file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("cannot read dictionary '{}'", path.display()))?;
        let dictionary = Self::parse(&raw)
            .with_context(|| format!("malformed dictionary '{}'", path.display()))?;
        tracing::info!("loaded {} words from '{}'", dictionary.len(), path.display());
        Ok(dictionary)
    }

    /// Parses the contents of a dictionary file
    pub fn parse(raw: &str) -> Result<Self> {
        let mut dictionary = Self::default();

        for (i, line) in raw.lines().enumerate() {
            let fields: Vec<&str> = line.trim().split('\t').collect();
            let [word, count] = fields.as_slice() else {
                bail!("line {}: expected `word<TAB>count`, found {:?}", i + 1, line);
            };
            let count: u64 = count.parse()
                .with_context(|| format!("line {}: bad count {:?}", i + 1, count))?;
            let word = if *word == ESCAPED_NEWLINE { "\n" } else { *word };

            let id = i as i64;
            dictionary.word2ind.insert(word.to_string(), id);
            dictionary.ind2word.insert(id, word.to_string());
            dictionary.counts.insert(word.to_string(), count);
        }

        Ok(dictionary)
    }

    /// Builds a dictionary from `(word, count)` pairs, ids in iteration order
    pub fn from_words<'a, I>(words: I) -> Self
    where I: IntoIterator<Item = (&'a str, u64)>
    {
        let mut dictionary = Self::default();
        for (i, (word, count)) in words.into_iter().enumerate() {
            dictionary.word2ind.insert(word.to_string(), i as i64);
            dictionary.ind2word.insert(i as i64, word.to_string());
            dictionary.counts.insert(word.to_string(), count);
        }
        dictionary
    }

    /// Tokens to vector: ids for each token, `__unk__` for unknown words
    pub fn t2v<S>(&self, tokens: &[S]) -> Result<Vec<i64>>
    where S: AsRef<str>
    {
        tokens.iter()
            .map(|token| match self.word2ind.get(token.as_ref()) {
                Some(&id) => Ok(id),
                None => self.index_of(UNK_TOKEN)
                    .with_context(|| format!("unknown word {:?} and no {} entry", token.as_ref(), UNK_TOKEN)),
            })
            .collect()
    }

    /// Vector to text: the words of `ids` joined by single spaces
    pub fn v2t(&self, ids: &[i64]) -> Result<String> {
        let words = ids.iter()
            .map(|&id| self.word_of(id).with_context(|| format!("id {} is not in the dictionary", id)))
            .collect::<Result<Vec<_>>>()?;
        Ok(words.join(" "))
    }

    /// Like [`v2t`](Self::v2t), but stops before the first end or padding token
    pub fn pred2text(&self, ids: &[i64]) -> Result<String> {
        let end = self.index_of(END_TOKEN);
        let null = self.index_of(NULL_TOKEN);
        let stop = ids.iter()
            .position(|&id| Some(id) == end || Some(id) == null)
            .unwrap_or(ids.len());
        self.v2t(&ids[..stop])
    }

    pub fn index_of(&self, word: &str) -> Option<i64> {
        self.word2ind.get(word).copied()
    }

    pub fn word_of(&self, id: i64) -> Option<&str> {
        self.ind2word.get(&id).map(String::as_str)
    }

    pub fn count(&self, word: &str) -> Option<u64> {
        self.counts.get(word).copied()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.counts.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DICT: &str = "__null__\t1000000003\n__start__\t1000000002\n__end__\t1000000001\n__unk__\t1000000000\nhello\t10\n\\n\t7\nworld\t3\n.\t9\n";

    fn dictionary() -> ChatDictionary {
        ChatDictionary::parse(DICT).unwrap()
    }

    #[test]
    fn test_parse_assigns_line_numbers() {
        let d = dictionary();
        assert_eq!(d.len(), 8);
        assert_eq!(d.index_of(NULL_TOKEN), Some(0));
        assert_eq!(d.index_of("hello"), Some(4));
        assert_eq!(d.count("world"), Some(3));
    }

    #[test]
    fn test_escaped_newline_becomes_newline() {
        let d = dictionary();
        assert_eq!(d.index_of("\n"), Some(5));
        assert!(!d.contains("\\n"));
    }

    #[test]
    fn test_t2v_maps_unknown_to_unk() {
        let d = dictionary();
        assert_eq!(d.t2v(&["hello", "there", "world"]).unwrap(), vec![4, 3, 6]);
    }

    #[test]
    fn test_t2v_without_unk_is_error() {
        let d = ChatDictionary::from_words([("a", 1), ("b", 1)]);
        assert_eq!(d.t2v(&["b", "a"]).unwrap(), vec![1, 0]);
        assert!(d.t2v(&["c"]).is_err());
    }

    #[test]
    fn test_v2t_joins_with_spaces() {
        let d = dictionary();
        assert_eq!(d.v2t(&[1, 4, 6, 7, 2]).unwrap(), "__start__ hello world . __end__");
        assert!(d.v2t(&[42]).is_err());
    }

    #[test]
    fn test_pred2text_stops_at_end_or_null() {
        let d = dictionary();
        assert_eq!(d.pred2text(&[4, 6, 2, 7]).unwrap(), "hello world");
        assert_eq!(d.pred2text(&[4, 0, 0]).unwrap(), "hello");
        assert_eq!(d.pred2text(&[4, 6]).unwrap(), "hello world");
        assert_eq!(d.pred2text(&[2]).unwrap(), "");
    }

    #[test]
    fn test_duplicate_word_takes_later_line() {
        let d = ChatDictionary::parse("a\t1\nb\t2\na\t5\n").unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.index_of("a"), Some(2));
        assert_eq!(d.count("a"), Some(5));
        assert_eq!(d.word_of(2), Some("a"));
    }

    #[test]
    fn test_malformed_lines_are_errors() {
        assert!(ChatDictionary::parse("hello\n").is_err());
        assert!(ChatDictionary::parse("hello\t1\textra\n").is_err());
        assert!(ChatDictionary::parse("hello\tmany\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("chatseq-dict-{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&path, DICT).unwrap();
        let d = ChatDictionary::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(d.len(), 8);
        assert!(ChatDictionary::load(&path).is_err());
    }
}
