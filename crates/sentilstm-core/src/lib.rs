//! # SentiLSTM Core
//!
//! Data preparation and the recurrent classifier for binary sentiment
//! analysis over pretrained GloVe vectors: word tokenization, vocabulary
//! building, fixed-length id encoding, embedding table construction, the
//! [`SentimentLstm`] model (built on candle), and evaluation metrics.
//!
//! ## Quick Start
//!
//! ```rust
//! use sentilstm_core::text::{WordTokenizer, Vocabulary, encode};
//!
//! let tokenizer = WordTokenizer::new().unwrap();
//! let train = ["a wonderful film", "dull and far too long"];
//! let vocab = Vocabulary::build(&tokenizer, &[&train[..]]);
//!
//! let encoded = encode(&tokenizer, &train, &vocab, vocab.max_sequence_len()).unwrap();
//! assert_eq!(encoded.seq_len(), 5);
//! assert_eq!(encoded.lengths(), [3, 5]);
//! ```
pub mod config;
pub mod embeddings;
pub mod error;
pub mod metrics;
pub mod model;
pub mod text;

// Re-export primary API
pub use config::{ModelConfig, NUM_CLASSES};
pub use embeddings::{EmbeddingTable, load_pretrained};
pub use error::{Result, SentiError};
pub use metrics::{ConfusionMatrix, accuracy, no_information_rate};
pub use model::{SentimentLstm, load_embeddings};
pub use text::{EncodedSequences, Vocabulary, WordTokenizer, encode};
