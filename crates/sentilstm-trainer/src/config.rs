//! Run configuration: hyperparameters, switches and file locations.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use sentilstm_core::ModelConfig;

/// Input and output files of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub train_csv: PathBuf,
    pub val_csv: PathBuf,
    pub test_csv: PathBuf,
    /// GloVe text file.
    pub embeddings: PathBuf,
    /// Best-model snapshot, overwritten on every improvement.
    pub checkpoint: PathBuf,
    /// Optional JSON summary of the run.
    pub report: Option<PathBuf>,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            train_csv: PathBuf::from("train_cleaned.csv"),
            val_csv: PathBuf::from("val_cleaned.csv"),
            test_csv: PathBuf::from("test_cleaned.csv"),
            embeddings: PathBuf::from("glove.6B.50d.txt"),
            checkpoint: PathBuf::from("lstm_sentiment_cleanData.safetensors"),
            report: None,
        }
    }
}

/// Everything a training run needs. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub model: ModelConfig,
    /// Fixed sequence length; `None` uses the longest sentence in the data.
    pub seq_len: Option<usize>,
    pub n_epochs: usize,
    pub lr: f64,
    pub batch_size: usize,
    /// Run the training loop; when off, only the saved checkpoint is evaluated.
    pub train: bool,
    /// Write a checkpoint whenever validation accuracy improves.
    pub save_model: bool,
    /// Permute the training rows every epoch.
    pub shuffle: bool,
    pub seed: u64,
    pub paths: DataPaths,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            seq_len: None,
            n_epochs: 10,
            lr: 1e-3,
            batch_size: 32,
            train: true,
            save_model: true,
            shuffle: false,
            seed: 42,
            paths: DataPaths::default(),
        }
    }
}

impl TrainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON configuration; missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_seq_len(mut self, seq_len: Option<usize>) -> Self {
        self.seq_len = seq_len;
        self
    }

    pub fn with_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_training(mut self, train: bool) -> Self {
        self.train = train;
        self
    }

    pub fn with_saving(mut self, save_model: bool) -> Self {
        self.save_model = save_model;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool, seed: u64) -> Self {
        self.shuffle = shuffle;
        self.seed = seed;
        self
    }

    pub fn with_paths(mut self, paths: DataPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.model.validate()?;
        if self.batch_size == 0 {
            bail!("batch_size must be positive");
        }
        if self.seq_len == Some(0) {
            bail!("seq_len must be positive when set");
        }
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            bail!("lr must be a positive finite number, got {}", self.lr);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainConfig::default();
        assert_eq!(config.n_epochs, 10);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.lr, 1e-3);
        assert!(config.train && config.save_model && !config.shuffle);
        assert_eq!(config.seq_len, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainConfig = serde_json::from_str(
            r#"{ "n_epochs": 3, "model": { "hidden_size": 32 }, "paths": { "embeddings": "g.txt" } }"#,
        )
        .unwrap();
        assert_eq!(config.n_epochs, 3);
        assert_eq!(config.model.hidden_size, 32);
        assert_eq!(config.model.n_layers, 3);
        assert_eq!(config.paths.embeddings, PathBuf::from("g.txt"));
        assert_eq!(config.paths.train_csv, PathBuf::from("train_cleaned.csv"));
    }

    #[test]
    fn test_validate() {
        assert!(TrainConfig::new().with_batch_size(0).validate().is_err());
        assert!(TrainConfig::new().with_seq_len(Some(0)).validate().is_err());
        assert!(TrainConfig::new().with_lr(0.0).validate().is_err());
        assert!(
            TrainConfig::new()
                .with_model(ModelConfig::new().with_layers(0))
                .validate()
                .is_err()
        );
    }
}
