//! # Pretrained Embeddings
//!
//! Loads GloVe-style word vectors (`<token> <f_1> ... <f_D>` per line) and
//! aligns them with a [`Vocabulary`] to produce the initial embedding table.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use candle_core::{Device, Tensor};
use tracing::{debug, info};

use crate::error::{Result, SentiError};
use crate::text::Vocabulary;

/// Value of every component of the row given to tokens the pretrained file
/// does not cover. Non-zero so it never looks like padding.
pub const UNKNOWN_FILL: f32 = 1.0;

/// Read the vectors of every vocabulary token present in a pretrained file.
///
/// Returns a map from vocabulary id to vector. Blank lines (including the
/// trailing one many dumps end with) are skipped; lines whose token is not
/// in the vocabulary are not parsed beyond the token.
pub fn load_pretrained<P: AsRef<Path>>(
    path: P,
    vocab: &Vocabulary,
    dim: usize,
) -> Result<HashMap<u32, Vec<f32>>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SentiError::EmbeddingsNotFound {
            path: path.to_path_buf(),
        });
    }

    let reader = BufReader::new(File::open(path)?);
    let mut vectors = HashMap::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let Some(token) = fields.next() else {
            continue;
        };
        let Some(id) = vocab.id(token) else {
            continue;
        };

        let vector = fields
            .map(|field| {
                field.parse::<f32>().map_err(|e| SentiError::EmbeddingFormat {
                    line: index + 1,
                    reason: format!("component {field:?}: {e}"),
                })
            })
            .collect::<Result<Vec<f32>>>()?;

        if vector.len() != dim {
            return Err(SentiError::EmbeddingFormat {
                line: index + 1,
                reason: format!("expected {dim} components, found {}", vector.len()),
            });
        }
        vectors.insert(id, vector);
    }

    debug!(path = %path.display(), found = vectors.len(), "parsed pretrained vectors");
    Ok(vectors)
}

/// Dense `(vocab.len() + 2, dim)` lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    data: Vec<f32>,
    rows: usize,
    dim: usize,
    coverage: usize,
}

impl EmbeddingTable {
    /// Assemble the table: row 0 is zero, rows with a pretrained vector copy
    /// it, every other row is filled with [`UNKNOWN_FILL`].
    pub fn build(vocab: &Vocabulary, pretrained: &HashMap<u32, Vec<f32>>, dim: usize) -> Self {
        let rows = vocab.table_rows();
        let mut data = vec![UNKNOWN_FILL; rows * dim];
        let mut coverage = 0;

        for (_, id) in vocab.iter() {
            if let Some(vector) = pretrained.get(&id) {
                let start = id as usize * dim;
                data[start..start + dim].copy_from_slice(vector);
                coverage += 1;
            }
        }
        data[..dim].fill(0.0);

        info!(
            vocab = vocab.len(),
            coverage,
            "built embedding table ({:.1}% pretrained)",
            if vocab.is_empty() { 0.0 } else { 100.0 * coverage as f64 / vocab.len() as f64 }
        );

        Self {
            data,
            rows,
            dim,
            coverage,
        }
    }

    /// Read a pretrained file and build the table in one go.
    pub fn from_file<P: AsRef<Path>>(path: P, vocab: &Vocabulary, dim: usize) -> Result<Self> {
        let pretrained = load_pretrained(path, vocab, dim)?;
        Ok(Self::build(vocab, &pretrained, dim))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of vocabulary tokens that received a pretrained vector.
    pub fn coverage(&self) -> usize {
        self.coverage
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    /// Copy the table into a `(rows, dim)` f32 tensor.
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        Ok(Tensor::from_slice(&self.data, (self.rows, self.dim), device)?)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::text::WordTokenizer;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sentilstm-emb-{}-{name}.txt",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn vocab(corpus: &[&str]) -> Vocabulary {
        Vocabulary::build(&WordTokenizer::new().unwrap(), &[corpus])
    }

    #[test]
    fn test_table_rows() {
        let vocab = vocab(&["good bad meh"]);
        let path = write_temp(
            "rows",
            "good 0.1 0.2 0.3\nunrelated 9 9 9\nbad -1 -2 -3\n\n",
        );

        let table = EmbeddingTable::from_file(&path, &vocab, 3).unwrap();
        assert_eq!(table.rows(), 5);
        assert_eq!(table.dim(), 3);
        assert_eq!(table.coverage(), 2);

        assert_eq!(table.row(0), [0.0, 0.0, 0.0]);
        assert_eq!(table.row(vocab.id("good").unwrap() as usize), [0.1, 0.2, 0.3]);
        assert_eq!(table.row(vocab.id("bad").unwrap() as usize), [-1.0, -2.0, -3.0]);
        assert_eq!(table.row(vocab.id("meh").unwrap() as usize), [1.0, 1.0, 1.0]);
        assert_eq!(table.row(4), [1.0, 1.0, 1.0]);

        let tensor = table.to_tensor(&Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[5, 3]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file() {
        let vocab = vocab(&["x"]);
        let err = load_pretrained("/definitely/not/here/glove.txt", &vocab, 3).unwrap_err();
        assert!(matches!(err, SentiError::EmbeddingsNotFound { .. }));
    }

    #[test]
    fn test_wrong_dimension() {
        let vocab = vocab(&["good"]);
        let path = write_temp("dim", "good 0.1 0.2\n");
        let err = load_pretrained(&path, &vocab, 3).unwrap_err();
        assert!(matches!(err, SentiError::EmbeddingFormat { line: 1, .. }));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_bad_float() {
        let vocab = vocab(&["good"]);
        let path = write_temp("float", "other 1 2 3\ngood 0.1 abc 0.3\n");
        let err = load_pretrained(&path, &vocab, 3).unwrap_err();
        assert!(matches!(err, SentiError::EmbeddingFormat { line: 2, .. }));
        std::fs::remove_file(path).ok();
    }
}
