//! Word and punctuation tokenizer.
//!
//! Splits text into runs of word characters, single punctuation marks and
//! newlines. Every other kind of whitespace only separates tokens.

// Marks that are Alphabetic but not letters (Devanagari vowel signs, for one)
// count as word characters, so a word in those scripts is never split apart.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize `text` into borrowed slices.
///
/// ```rust
/// use chatseq::tokenize::tokenize;
///
/// assert_eq!(tokenize("hi, there!\nok"), vec!["hi", ",", "there", "!", "\n", "ok"]);
/// ```
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if is_word_char(c) {
            word_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = word_start.take() {
            tokens.push(&text[start..i]);
        }
        if c == '\n' || !c.is_whitespace() {
            tokens.push(&text[i..i + c.len_utf8()]);
        }
    }
    if let Some(start) = word_start {
        tokens.push(&text[start..]);
    }

    tokens
}
