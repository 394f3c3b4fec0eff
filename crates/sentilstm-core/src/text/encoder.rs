//! Fixed-length id encoding of raw sentences.

use candle_core::{Device, Tensor};

use crate::error::{Result, SentiError};
use crate::text::tokenizer::WordTokenizer;
use crate::text::vocab::{PAD_ID, Vocabulary};

/// Row-major `(len, seq_len)` matrix of token ids with the true length of
/// every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSequences {
    ids: Vec<u32>,
    lengths: Vec<usize>,
    seq_len: usize,
}

impl EncodedSequences {
    /// Number of encoded sentences.
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Width every row is padded or truncated to.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Ids of one sentence, padding included.
    pub fn row(&self, index: usize) -> &[u32] {
        &self.ids[index * self.seq_len..(index + 1) * self.seq_len]
    }

    /// Non-padding token count of every row.
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Collect the given rows into a `(indices.len(), seq_len)` u32 tensor
    /// along with their lengths.
    pub fn gather(&self, indices: &[usize], device: &Device) -> Result<(Tensor, Vec<usize>)> {
        let mut ids = Vec::with_capacity(indices.len() * self.seq_len);
        let mut lengths = Vec::with_capacity(indices.len());

        for &index in indices {
            if index >= self.len() {
                return Err(SentiError::ShapeMismatch(format!(
                    "row {index} out of range for {} sequences",
                    self.len()
                )));
            }
            ids.extend_from_slice(self.row(index));
            lengths.push(self.lengths[index]);
        }

        let tensor = Tensor::from_vec(ids, (indices.len(), self.seq_len), device)?;
        Ok((tensor, lengths))
    }
}

/// Encode sentences as vocabulary ids, truncated or right-padded with
/// [`PAD_ID`] to `pad_to` entries.
///
/// Fails with [`SentiError::UnknownToken`] on the first token missing from
/// `vocab`.
pub fn encode<S: AsRef<str>>(
    tokenizer: &WordTokenizer,
    sentences: &[S],
    vocab: &Vocabulary,
    pad_to: usize,
) -> Result<EncodedSequences> {
    let mut ids = Vec::with_capacity(sentences.len() * pad_to);
    let mut lengths = Vec::with_capacity(sentences.len());

    for sentence in sentences {
        let mut row = tokenizer
            .tokenize(sentence.as_ref())
            .into_iter()
            .map(|token| vocab.id(&token).ok_or(SentiError::UnknownToken { token }))
            .collect::<Result<Vec<u32>>>()?;

        row.truncate(pad_to);
        lengths.push(row.len());
        row.resize(pad_to, PAD_ID);
        ids.extend(row);
    }

    Ok(EncodedSequences {
        ids,
        lengths,
        seq_len: pad_to,
    })
}
