//! Training loop, evaluation and the end-to-end run.

use anyhow::{Context, bail};
use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use tracing::{debug, info, warn};

use sentilstm_core::metrics::{ConfusionMatrix, accuracy, no_information_rate};
use sentilstm_core::text::{Vocabulary, WordTokenizer};
use sentilstm_core::{EmbeddingTable, SentimentLstm, load_embeddings};

use crate::checkpoint::{BestTracker, Checkpoint};
use crate::config::TrainConfig;
use crate::data::{LabelledSequences, Split, epoch_order, load_split};
use crate::report::{EpochReport, RunReport, TestReport};

/// Encoded splits plus the vocabulary and sequence length they share.
pub struct PreparedData {
    pub vocab: Vocabulary,
    pub seq_len: usize,
    pub train: LabelledSequences,
    pub val: LabelledSequences,
    pub test: LabelledSequences,
}

impl PreparedData {
    /// Build the vocabulary over all three splits and encode each of them.
    pub fn from_splits(
        train: &Split,
        val: &Split,
        test: &Split,
        seq_len: Option<usize>,
    ) -> anyhow::Result<Self> {
        let tokenizer = WordTokenizer::new()?;

        info!("tokenizing all splits to get the vocabulary and the maximum sequence length");
        let vocab = Vocabulary::build(
            &tokenizer,
            &[&train.texts[..], &test.texts[..], &val.texts[..]],
        );
        let seq_len = seq_len.unwrap_or(vocab.max_sequence_len());
        if seq_len == 0 {
            bail!("sequence length is 0: the data contains no tokens");
        }
        info!(vocab = vocab.len(), seq_len, "vocabulary built");

        info!("converting all sentences to sequences of token ids");
        Ok(Self {
            train: LabelledSequences::encode(&tokenizer, train, &vocab, seq_len)?,
            val: LabelledSequences::encode(&tokenizer, val, &vocab, seq_len)?,
            test: LabelledSequences::encode(&tokenizer, test, &vocab, seq_len)?,
            vocab,
            seq_len,
        })
    }
}

/// Owns the model, its variables and the checkpoint of one run.
pub struct Trainer {
    config: TrainConfig,
    device: Device,
    varmap: VarMap,
    model: SentimentLstm,
    checkpoint: Checkpoint,
}

impl Trainer {
    /// Build the model and copy the pretrained table into its embedding.
    pub fn new(
        config: TrainConfig,
        vocab: &Vocabulary,
        seq_len: usize,
        table: &EmbeddingTable,
        device: Device,
    ) -> anyhow::Result<Self> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = SentimentLstm::new(vocab.len(), seq_len, &config.model, vb)?;
        load_embeddings(&mut varmap, table, &device)?;

        let params: usize = varmap.all_vars().iter().map(|v| v.as_tensor().elem_count()).sum();
        info!(params, "model initialized");

        let checkpoint = Checkpoint::new(config.paths.checkpoint.clone());
        Ok(Self {
            config,
            device,
            varmap,
            model,
            checkpoint,
        })
    }

    pub fn model(&self) -> &SentimentLstm {
        &self.model
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// One pass over the training rows in `order`. Returns the mean batch loss.
    pub fn train_epoch(
        &mut self,
        optimizer: &mut AdamW,
        data: &LabelledSequences,
        order: &[usize],
    ) -> anyhow::Result<f64> {
        let mut loss_sum = 0.0;
        let mut steps = 0usize;

        for batch in order.chunks(self.config.batch_size) {
            let (ids, lengths) = data.sequences.gather(batch, &self.device)?;
            let targets = Tensor::new(data.labels_at(batch).as_slice(), &self.device)?;

            let logits = self.model.forward_t(&ids, &lengths, true)?;
            let loss = candle_nn::loss::cross_entropy(&logits, &targets)?;
            optimizer.backward_step(&loss)?;

            loss_sum += loss.to_scalar::<f32>()? as f64;
            steps += 1;
            debug!(step = steps, loss = loss_sum / steps as f64, "training loss");
        }

        Ok(if steps == 0 { 0.0 } else { loss_sum / steps as f64 })
    }

    /// Predicted labels for every row, in batches, without dropout or
    /// batch-norm updates.
    pub fn predict(&self, data: &LabelledSequences) -> anyhow::Result<Vec<u32>> {
        let order: Vec<usize> = (0..data.len()).collect();
        let mut predictions = Vec::with_capacity(data.len());
        for batch in order.chunks(self.config.batch_size) {
            let (ids, lengths) = data.sequences.gather(batch, &self.device)?;
            predictions.extend(self.model.predict(&ids, &lengths)?);
        }
        Ok(predictions)
    }

    /// Accuracy on a split, in percent.
    pub fn evaluate(&self, data: &LabelledSequences) -> anyhow::Result<f64> {
        Ok(accuracy(&data.labels, &self.predict(data)?))
    }

    /// Run every epoch, checkpointing on each validation improvement.
    ///
    /// The first evaluated epoch always counts as an improvement, so a run
    /// with saving enabled writes a checkpoint even when its first
    /// validation accuracy is 0%. Later epochs must strictly beat the best.
    pub fn fit(
        &mut self,
        train: &LabelledSequences,
        val: &LabelledSequences,
    ) -> anyhow::Result<(Vec<EpochReport>, BestTracker)> {
        let mut optimizer = AdamW::new(
            self.varmap.all_vars(),
            ParamsAdamW {
                lr: self.config.lr,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;
        let mut rng = oorandom::Rand32::new(self.config.seed);
        let mut best = BestTracker::new();
        let mut history = Vec::with_capacity(self.config.n_epochs);

        info!(epochs = self.config.n_epochs, batch_size = self.config.batch_size, "starting training loop");
        for epoch in 0..self.config.n_epochs {
            let order = epoch_order(train.len(), self.config.shuffle, &mut rng);
            let train_loss = self.train_epoch(&mut optimizer, train, &order)?;

            let train_accuracy = self.evaluate(train)?;
            let val_accuracy = self.evaluate(val)?;
            info!(
                "Epoch {} | Train Loss {:.5}, Train Acc {:.2}, Val Acc {:.2}",
                epoch, train_loss, train_accuracy, val_accuracy
            );

            let saved = self.config.save_model && best.observe(val_accuracy);
            if saved {
                self.checkpoint.save(&self.varmap)?;
                info!(path = %self.checkpoint.path().display(), "the model has been saved");
            }

            history.push(EpochReport {
                epoch,
                train_loss,
                train_accuracy,
                val_accuracy,
                saved,
            });
        }

        Ok((history, best))
    }

    /// Score the test split, first restoring the best checkpoint when
    /// `restore` is set (a missing file is then fatal).
    pub fn test(&mut self, test: &LabelledSequences, restore: bool) -> anyhow::Result<TestReport> {
        if restore {
            self.checkpoint.load(&mut self.varmap)?;
        } else {
            warn!("no checkpoint written in this run, evaluating the in-memory model");
        }

        let predictions = self.predict(test)?;
        Ok(TestReport {
            accuracy: accuracy(&test.labels, &predictions),
            confusion: ConfusionMatrix::from_predictions(&test.labels, &predictions),
            no_information_rate: no_information_rate(&test.labels),
        })
    }
}

/// Load the data, train, and evaluate the best model on the test split.
pub fn run(config: TrainConfig) -> anyhow::Result<RunReport> {
    config.validate()?;
    let paths = &config.paths;

    let train = load_split(&paths.train_csv)?;
    let val = load_split(&paths.val_csv)?;
    let test = load_split(&paths.test_csv)?;
    info!(train = train.len(), val = val.len(), test = test.len(), "loaded splits");

    let data = PreparedData::from_splits(&train, &val, &test, config.seq_len)?;
    let table = EmbeddingTable::from_file(&paths.embeddings, &data.vocab, config.model.embedding_dim)
        .context("loading pretrained embeddings")?;
    if table.coverage() < data.vocab.len() / 2 {
        warn!(
            coverage = table.coverage(),
            vocab = data.vocab.len(),
            "less than half of the vocabulary has a pretrained vector"
        );
    }

    let device = Device::cuda_if_available(0)?;
    let mut trainer = Trainer::new(config.clone(), &data.vocab, data.seq_len, &table, device)?;

    info!(
        "The no information rate is {:.2}",
        no_information_rate(&data.test.labels)
    );

    let (epochs, best) = if config.train {
        trainer.fit(&data.train, &data.val)?
    } else {
        (Vec::new(), BestTracker::new())
    };

    // A checkpoint left over from an earlier run is only trusted when this
    // run is not training one of its own.
    let from_checkpoint = !config.train || best.best().is_some();
    let test_report = trainer.test(&data.test, from_checkpoint)?;

    let report = RunReport {
        vocab_size: data.vocab.len(),
        seq_len: data.seq_len,
        embedding_coverage: table.coverage(),
        epochs,
        best_val_accuracy: best.best(),
        checkpoint: trainer.checkpoint().path().to_path_buf(),
        test: test_report,
    };

    if let Some(path) = &config.paths.report {
        report.write(path)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::path::{Path, PathBuf};

    use sentilstm_core::{ModelConfig, model::EMBEDDING_WEIGHT};

    use super::*;
    use crate::config::DataPaths;

    const SENTENCES: [&str; 4] = [
        "a truly dull film",
        "great fun",
        "boring and far too long",
        "great cast and a great plot",
    ];
    const LABELS: [u32; 4] = [0, 1, 0, 1];

    fn workdir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sentilstm-e2e-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_fixture(dir: &Path) -> DataPaths {
        let mut csv = String::from("cleaned_text,Label\n");
        for (text, label) in SENTENCES.iter().zip(LABELS) {
            csv.push_str(&format!("{text},{label}\n"));
        }

        let tokens: BTreeSet<&str> = SENTENCES.iter().flat_map(|s| s.split(' ')).collect();
        let mut glove = String::new();
        for (i, token) in tokens.iter().enumerate() {
            let x = i as f32 / 10.0;
            glove.push_str(&format!("{token} {x} {} {} 0.5\n", -x, x * x));
        }
        glove.push('\n');

        let paths = DataPaths {
            train_csv: dir.join("train.csv"),
            val_csv: dir.join("val.csv"),
            test_csv: dir.join("test.csv"),
            embeddings: dir.join("glove.txt"),
            checkpoint: dir.join("best.safetensors"),
            report: Some(dir.join("report.json")),
        };
        for path in [&paths.train_csv, &paths.val_csv, &paths.test_csv] {
            std::fs::write(path, &csv).unwrap();
        }
        std::fs::write(&paths.embeddings, glove).unwrap();
        paths
    }

    fn toy_config(paths: DataPaths) -> TrainConfig {
        TrainConfig::new()
            .with_model(
                ModelConfig::new()
                    .with_embedding_dim(4)
                    .with_hidden_size(3)
                    .with_layers(2),
            )
            .with_epochs(1)
            .with_batch_size(2)
            .with_paths(paths)
    }

    #[test]
    fn test_prepared_data_shapes() {
        let split = Split {
            texts: SENTENCES.iter().map(|s| s.to_string()).collect(),
            labels: LABELS.to_vec(),
        };
        let data = PreparedData::from_splits(&split, &split, &split, None).unwrap();

        let distinct: BTreeSet<&str> = SENTENCES.iter().flat_map(|s| s.split(' ')).collect();
        assert_eq!(data.vocab.len(), distinct.len());
        assert_eq!(data.seq_len, 6);
        for set in [&data.train, &data.val, &data.test] {
            assert_eq!(set.len(), 4);
            for i in 0..set.len() {
                assert_eq!(set.sequences.row(i).len(), data.seq_len);
            }
        }
    }

    fn toy_trainer(config: TrainConfig) -> (Trainer, PreparedData) {
        let split = Split {
            texts: SENTENCES.iter().map(|s| s.to_string()).collect(),
            labels: LABELS.to_vec(),
        };
        let data = PreparedData::from_splits(&split, &split, &split, None).unwrap();
        let table = EmbeddingTable::build(&data.vocab, &HashMap::new(), config.model.embedding_dim);
        let trainer = Trainer::new(config, &data.vocab, data.seq_len, &table, Device::Cpu).unwrap();
        (trainer, data)
    }

    #[test]
    fn test_padding_row_stays_zero_after_training() {
        let dir = workdir("row0");
        let config = toy_config(write_fixture(&dir)).with_epochs(5).with_saving(false);
        let (mut trainer, data) = toy_trainer(config);

        trainer.fit(&data.train, &data.val).unwrap();

        let weight = trainer
            .varmap
            .data()
            .lock()
            .unwrap()
            .get(EMBEDDING_WEIGHT)
            .unwrap()
            .as_tensor()
            .to_vec2::<f32>()
            .unwrap();
        assert_eq!(weight[0], [0.0; 4]);
        assert!(weight[1..].iter().flatten().any(|&v| v != 1.0));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_checkpoint_holds_best_epoch() {
        let dir = workdir("best");
        let config = toy_config(write_fixture(&dir)).with_epochs(6).with_lr(0.05);
        let (mut trainer, data) = toy_trainer(config.clone());

        let (history, best) = trainer.fit(&data.train, &data.val).unwrap();
        let best = best.best().unwrap();

        let max = history.iter().map(|e| e.val_accuracy).fold(f64::MIN, f64::max);
        assert_eq!(best, max);

        let saved: Vec<f64> = history.iter().filter(|e| e.saved).map(|e| e.val_accuracy).collect();
        assert!(history[0].saved);
        assert!(saved.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(saved.last().copied(), Some(best));

        let (mut restored, _) = toy_trainer(config);
        restored.checkpoint.load(&mut restored.varmap).unwrap();
        assert_eq!(restored.evaluate(&data.val).unwrap(), best);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_end_to_end_run() {
        let dir = workdir("run");
        let paths = write_fixture(&dir);
        let checkpoint = paths.checkpoint.clone();
        let report_path = paths.report.clone().unwrap();

        let report = run(toy_config(paths)).unwrap();

        let distinct: BTreeSet<&str> = SENTENCES.iter().flat_map(|s| s.split(' ')).collect();
        assert_eq!(report.vocab_size, distinct.len());
        assert_eq!(report.embedding_coverage, distinct.len());
        assert_eq!(report.seq_len, 6);

        assert_eq!(report.epochs.len(), 1);
        let epoch = &report.epochs[0];
        assert!(epoch.saved);
        assert!((0.0..=100.0).contains(&epoch.val_accuracy));
        assert!(epoch.train_loss.is_finite());
        assert_eq!(report.best_val_accuracy, Some(epoch.val_accuracy));

        assert!(checkpoint.exists());
        assert!(report_path.exists());
        assert!((0.0..=100.0).contains(&report.test.accuracy));
        assert_eq!(report.test.confusion.total(), SENTENCES.len());
        assert_eq!(report.test.no_information_rate, 50.0);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_eval_only_reuses_checkpoint() {
        let dir = workdir("eval");
        let paths = write_fixture(&dir);

        let trained = run(toy_config(paths.clone())).unwrap();
        let evaluated = run(toy_config(paths).with_training(false)).unwrap();

        assert!(evaluated.epochs.is_empty());
        assert_eq!(evaluated.test, trained.test);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_eval_only_without_checkpoint_fails() {
        let dir = workdir("nockpt");
        let paths = write_fixture(&dir);

        let err = run(toy_config(paths).with_training(false)).unwrap_err();
        assert!(err.to_string().contains("checkpoint not found"));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_no_save_keeps_disk_clean() {
        let dir = workdir("nosave");
        let paths = write_fixture(&dir);
        let checkpoint = paths.checkpoint.clone();

        let report = run(toy_config(paths).with_saving(false).with_epochs(2)).unwrap();
        assert_eq!(report.epochs.len(), 2);
        assert!(report.epochs.iter().all(|e| !e.saved));
        assert!(!checkpoint.exists());
        assert_eq!(report.test.confusion.total(), SENTENCES.len());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_embeddings_is_fatal() {
        let dir = workdir("noglove");
        let paths = write_fixture(&dir);
        std::fs::remove_file(&paths.embeddings).unwrap();

        let err = run(toy_config(paths)).unwrap_err();
        assert!(format!("{err:#}").contains("pretrained embeddings not found"));

        std::fs::remove_dir_all(dir).ok();
    }
}
