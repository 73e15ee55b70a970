//! Text tokenization into display units
//!
//! Splits raw source text into the ordered word sequence the playback engine
//! paces through. Splitting is on runs of Unicode whitespace; empty results
//! are discarded, so every token in a [`WordSequence`] has length >= 1.
//!
//! Tokenization is a pure function: no side effects, no failure mode beyond
//! an empty sequence for empty or whitespace-only input, and re-tokenizing
//! the same input yields an equal sequence.

use std::sync::Arc;

/// Immutable ordered sequence of display tokens.
///
/// Created once per text load and replaced wholesale on the next load, never
/// mutated in place. Internally `Arc`-shared so snapshots and the tick task
/// read the same allocation without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSequence {
    words: Arc<[String]>,
}

impl WordSequence {
    /// Empty sequence (the "nothing loaded" value).
    pub fn empty() -> Self {
        Self { words: Arc::from(Vec::new()) }
    }

    /// Number of tokens in the sequence.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the sequence holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Token at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// Iterator over tokens in source order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// Split `text` into an ordered sequence of words.
///
/// Splits on one-or-more whitespace characters and filters zero-length
/// results. Order is the order of first appearance in the source text.
pub fn tokenize(text: &str) -> WordSequence {
    let words: Vec<String> = text.split_whitespace().map(str::to_owned).collect();
    WordSequence { words: words.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_single_spaces() {
        let seq = tokenize("alpha beta gamma");
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.get(0), Some("alpha"));
        assert_eq!(seq.get(1), Some("beta"));
        assert_eq!(seq.get(2), Some("gamma"));
    }

    #[test]
    fn collapses_whitespace_runs() {
        let seq = tokenize("  one\t\ttwo \n three  \r\n four ");
        let words: Vec<&str> = seq.iter().collect();
        assert_eq!(words, vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn empty_and_whitespace_only_input_yield_empty_sequence() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n\t  ").is_empty());
        assert_eq!(tokenize("").len(), 0);
    }

    #[test]
    fn no_zero_length_tokens() {
        let seq = tokenize(" a  b\n\nc ");
        assert!(seq.iter().all(|w| !w.is_empty()));
    }

    #[test]
    fn tokenize_is_idempotent() {
        let text = "the quick   brown\nfox";
        assert_eq!(tokenize(text), tokenize(text));
    }

    #[test]
    fn get_out_of_range_is_none() {
        let seq = tokenize("solo");
        assert_eq!(seq.get(1), None);
        assert_eq!(WordSequence::empty().get(0), None);
    }
}
