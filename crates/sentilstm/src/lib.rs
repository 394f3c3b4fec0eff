//! # SentiLSTM
//!
//! Binary sentiment classification with an LSTM over pretrained GloVe
//! embeddings.
//!
//! - [`sentilstm_core`]: tokenizer, vocabulary, encoder, embedding table, model, metrics
//! - [`sentilstm_trainer`]: CSV loading, training loop, checkpointing, reporting
//!
//! ```no_run
//! use sentilstm::{TrainConfig, run};
//!
//! let report = run(TrainConfig::default().with_epochs(5)).unwrap();
//! println!("{}", report.test);
//! ```
pub use sentilstm_core;
pub use sentilstm_trainer;

pub use sentilstm_core::{ModelConfig, SentimentLstm, Vocabulary, WordTokenizer};
pub use sentilstm_trainer::{TrainConfig, run};
