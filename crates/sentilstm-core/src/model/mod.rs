pub mod classifier;
pub mod lstm;

pub use classifier::{EMBEDDING_WEIGHT, SentimentLstm, length_mask, load_embeddings};
pub use lstm::StackedLstm;
