//! Train the LSTM sentiment classifier and report test metrics.

use std::path::PathBuf;

use clap::Parser;
use sentilstm_trainer::{TrainConfig, run};

/// CLI arguments. Every flag overrides the matching field of the config file.
#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train an LSTM sentiment classifier on GloVe embeddings")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "SENTILSTM_CONFIG")]
    config: Option<PathBuf>,

    /// Training split (CSV with cleaned_text and Label columns)
    #[arg(long)]
    train_csv: Option<PathBuf>,

    /// Validation split
    #[arg(long)]
    val_csv: Option<PathBuf>,

    /// Test split
    #[arg(long)]
    test_csv: Option<PathBuf>,

    /// Pretrained GloVe vectors
    #[arg(short, long, env = "SENTILSTM_EMBEDDINGS")]
    embeddings: Option<PathBuf>,

    /// Where the best model is written
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Write a JSON summary of the run here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Fixed sequence length (defaults to the longest sentence)
    #[arg(long)]
    seq_len: Option<usize>,

    #[arg(long)]
    embedding_dim: Option<usize>,

    #[arg(long)]
    epochs: Option<usize>,

    #[arg(long)]
    lr: Option<f64>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    hidden_size: Option<usize>,

    #[arg(long)]
    layers: Option<usize>,

    #[arg(long)]
    lstm_dropout: Option<f32>,

    #[arg(long)]
    linear_dropout: Option<f32>,

    /// Run the LSTM over padding instead of stopping at each sentence's length
    #[arg(long)]
    no_packed: bool,

    /// Skip training and evaluate the existing checkpoint
    #[arg(long)]
    eval_only: bool,

    /// Never write a checkpoint
    #[arg(long)]
    no_save: bool,

    /// Shuffle the training rows every epoch
    #[arg(long)]
    shuffle: bool,

    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_file(path)?,
            None => TrainConfig::default(),
        };

        let paths = &mut config.paths;
        if let Some(p) = self.train_csv {
            paths.train_csv = p;
        }
        if let Some(p) = self.val_csv {
            paths.val_csv = p;
        }
        if let Some(p) = self.test_csv {
            paths.test_csv = p;
        }
        if let Some(p) = self.embeddings {
            paths.embeddings = p;
        }
        if let Some(p) = self.checkpoint {
            paths.checkpoint = p;
        }
        if self.report.is_some() {
            paths.report = self.report;
        }

        let model = &mut config.model;
        if let Some(v) = self.embedding_dim {
            model.embedding_dim = v;
        }
        if let Some(v) = self.hidden_size {
            model.hidden_size = v;
        }
        if let Some(v) = self.layers {
            model.n_layers = v;
        }
        if let Some(v) = self.lstm_dropout {
            model.lstm_dropout = v;
        }
        if let Some(v) = self.linear_dropout {
            model.linear_dropout = v;
        }
        if self.no_packed {
            model.use_packed_sequence = false;
        }

        if self.seq_len.is_some() {
            config.seq_len = self.seq_len;
        }
        if let Some(v) = self.epochs {
            config.n_epochs = v;
        }
        if let Some(v) = self.lr {
            config.lr = v;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        config.train &= !self.eval_only;
        config.save_model &= !self.no_save;
        config.shuffle |= self.shuffle;

        Ok(config)
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let result = Cli::parse().into_config().and_then(run);
    match result {
        Ok(report) => println!("{}", report.test),
        Err(e) => {
            eprintln!("Training failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
