use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while preparing data for or running the classifier.
#[derive(Debug, Error)]
pub enum SentiError {
    /// A token produced during encoding has no vocabulary id.
    ///
    /// The vocabulary is built from every split it is applied to, so this
    /// indicates a broken invariant rather than bad user data.
    #[error("token {token:?} is not in the vocabulary")]
    UnknownToken {
        /// The token that failed the lookup.
        token: String,
    },

    /// The pretrained embedding file does not exist.
    #[error("pretrained embeddings not found at {}", path.display())]
    EmbeddingsNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// A line of the pretrained embedding file could not be parsed.
    #[error("malformed embedding line {line}: {reason}")]
    EmbeddingFormat {
        /// 1-based line number in the embedding file.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A hyperparameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tensor or batch dimensions do not line up.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A tokenizer pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Candle ML framework error.
    #[error("ML backend error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Result type alias for SentiLSTM operations.
pub type Result<T> = std::result::Result<T, SentiError>;
