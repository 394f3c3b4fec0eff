//! Model hyperparameters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentiError};

/// Number of output classes (negative, positive).
pub const NUM_CLASSES: usize = 2;

/// Architecture hyperparameters of [`SentimentLstm`](crate::model::SentimentLstm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of each word vector. Must match the pretrained file.
    pub embedding_dim: usize,
    /// LSTM hidden state size, also the width of the aggregated vector.
    pub hidden_size: usize,
    /// Number of stacked LSTM layers.
    pub n_layers: usize,
    /// Dropout applied between stacked LSTM layers while training.
    pub lstm_dropout: f32,
    /// Dropout applied after the temporal aggregation while training.
    pub linear_dropout: f32,
    /// Stop the recurrence at each example's true length instead of
    /// running over the padding.
    pub use_packed_sequence: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 50,
            hidden_size: 16,
            n_layers: 3,
            lstm_dropout: 0.5,
            linear_dropout: 0.5,
            use_packed_sequence: true,
        }
    }
}

impl ModelConfig {
    /// Create a model configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the embedding width.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Set the LSTM hidden size.
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Set the number of stacked LSTM layers.
    pub fn with_layers(mut self, n_layers: usize) -> Self {
        self.n_layers = n_layers;
        self
    }

    /// Set both dropout rates.
    pub fn with_dropout(mut self, lstm_dropout: f32, linear_dropout: f32) -> Self {
        self.lstm_dropout = lstm_dropout;
        self.linear_dropout = linear_dropout;
        self
    }

    /// Enable or disable length-aware recurrence.
    pub fn with_packed_sequence(mut self, enabled: bool) -> Self {
        self.use_packed_sequence = enabled;
        self
    }

    /// Reject configurations the model cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(SentiError::InvalidConfig("embedding_dim must be positive".into()));
        }
        if self.hidden_size == 0 {
            return Err(SentiError::InvalidConfig("hidden_size must be positive".into()));
        }
        if self.n_layers == 0 {
            return Err(SentiError::InvalidConfig("n_layers must be positive".into()));
        }
        for (name, p) in [
            ("lstm_dropout", self.lstm_dropout),
            ("linear_dropout", self.linear_dropout),
        ] {
            if !(0.0..1.0).contains(&p) {
                return Err(SentiError::InvalidConfig(format!(
                    "{name} must be in [0, 1), got {p}"
                )));
            }
        }
        Ok(())
    }
}
