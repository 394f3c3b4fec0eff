//! # SentiLSTM Trainer
//!
//! Drives a full experiment: loads the cleaned CSV splits, builds the
//! vocabulary and GloVe-initialized embedding table, trains the
//! [`SentimentLstm`](sentilstm_core::SentimentLstm) with mini-batch Adam,
//! keeps the checkpoint with the best validation accuracy, and reports test
//! accuracy, the confusion matrix and the no-information rate.

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod report;
pub mod trainer;

pub use checkpoint::{BestTracker, Checkpoint};
pub use config::{DataPaths, TrainConfig};
pub use report::{EpochReport, RunReport, TestReport};
pub use trainer::{PreparedData, Trainer, run};

