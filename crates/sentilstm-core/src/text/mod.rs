//! Text preparation: word tokenization, vocabulary construction and
//! fixed-length id encoding.

pub mod encoder;
pub mod tokenizer;
pub mod vocab;

pub use encoder::{EncodedSequences, encode};
pub use tokenizer::WordTokenizer;
pub use vocab::Vocabulary;
