//! Token vocabulary built from every text split of a run.

use std::collections::{BTreeSet, HashMap};

use crate::text::tokenizer::WordTokenizer;

/// Id reserved for padding positions.
pub const PAD_ID: u32 = 0;

/// Bijective mapping from distinct tokens to ids in `1..=len()`.
///
/// Ids follow the lexicographic order of the tokens, so the same corpus
/// always produces the same vocabulary.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    token_to_id: HashMap<String, u32>,
    max_sequence_len: usize,
}

impl Vocabulary {
    /// Tokenize every sentence of every split and collect the distinct tokens
    /// together with the longest token count seen.
    pub fn build<S: AsRef<str>>(tokenizer: &WordTokenizer, splits: &[&[S]]) -> Self {
        let mut tokens = BTreeSet::new();
        let mut max_sequence_len = 0;

        for sentence in splits.iter().flat_map(|split| split.iter()) {
            let sentence_tokens = tokenizer.tokenize(sentence.as_ref());
            max_sequence_len = max_sequence_len.max(sentence_tokens.len());
            tokens.extend(sentence_tokens);
        }

        let token_to_id = tokens
            .into_iter()
            .zip(1u32..)
            .collect::<HashMap<_, _>>();

        Self {
            token_to_id,
            max_sequence_len,
        }
    }

    /// Id of a token, if present.
    pub fn id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Whether the token has an id.
    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    /// Number of distinct tokens (padding excluded).
    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_to_id.is_empty()
    }

    /// Largest token count of any sentence the vocabulary was built from.
    pub fn max_sequence_len(&self) -> usize {
        self.max_sequence_len
    }

    /// Rows needed by an embedding table indexed by this vocabulary:
    /// padding, every token, and one spare trailing row.
    pub fn table_rows(&self) -> usize {
        self.len() + 2
    }

    /// Iterate over `(token, id)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.token_to_id.iter().map(|(token, &id)| (token.as_str(), id))
    }
}
