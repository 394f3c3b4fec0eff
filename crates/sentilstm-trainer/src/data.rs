//! Loading of the cleaned CSV splits and mini-batch ordering.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;
use sentilstm_core::text::{EncodedSequences, Vocabulary, WordTokenizer, encode};
use sentilstm_core::NUM_CLASSES;

/// One row of a split; other columns are ignored.
#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    cleaned_text: String,
    #[serde(rename = "Label")]
    label: u32,
}

/// Raw sentences and their labels.
#[derive(Debug, Clone, Default)]
pub struct Split {
    pub texts: Vec<String>,
    pub labels: Vec<u32>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Encoded sentences with their labels.
#[derive(Debug, Clone)]
pub struct LabelledSequences {
    pub sequences: EncodedSequences,
    pub labels: Vec<u32>,
}

impl LabelledSequences {
    /// Encode a split against a vocabulary, padding to `seq_len`.
    pub fn encode(
        tokenizer: &WordTokenizer,
        split: &Split,
        vocab: &Vocabulary,
        seq_len: usize,
    ) -> sentilstm_core::Result<Self> {
        Ok(Self {
            sequences: encode(tokenizer, &split.texts, vocab, seq_len)?,
            labels: split.labels.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels of the given rows.
    pub fn labels_at(&self, indices: &[usize]) -> Vec<u32> {
        indices.iter().map(|&i| self.labels[i]).collect()
    }
}

/// Load a split from a CSV file with `cleaned_text` and `Label` columns.
pub fn load_split<P: AsRef<Path>>(path: P) -> anyhow::Result<Split> {
    let path = path.as_ref();
    if !path.exists() {
        bail!("data file not found: {}", path.display());
    }

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut split = Split::default();
    for (row, record) in reader.deserialize::<Record>().enumerate() {
        let record = record.with_context(|| format!("{}: row {}", path.display(), row + 1))?;
        if record.label as usize >= NUM_CLASSES {
            bail!(
                "{}: row {} has label {}, expected 0 or 1",
                path.display(),
                row + 1,
                record.label
            );
        }
        split.texts.push(record.cleaned_text);
        split.labels.push(record.label);
    }

    Ok(split)
}

/// Row order for one epoch: identity, or a seeded Fisher-Yates permutation.
pub fn epoch_order(len: usize, shuffle: bool, rng: &mut oorandom::Rand32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    if shuffle {
        for i in (1..len).rev() {
            let j = rng.rand_range(0..(i as u32 + 1)) as usize;
            order.swap(i, j);
        }
    }
    order
}
