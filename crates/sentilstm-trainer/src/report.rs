//! Run summaries: per-epoch history and final test metrics.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use sentilstm_core::ConfusionMatrix;

/// Metrics logged at the end of one epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_accuracy: f64,
    /// Whether this epoch overwrote the checkpoint.
    pub saved: bool,
}

/// Held-out evaluation of the restored model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestReport {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub no_information_rate: f64,
}

/// Everything worth keeping from a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub vocab_size: usize,
    pub seq_len: usize,
    pub embedding_coverage: usize,
    pub epochs: Vec<EpochReport>,
    pub best_val_accuracy: Option<f64>,
    pub checkpoint: PathBuf,
    pub test: TestReport,
}

impl RunReport {
    /// Write the report as pretty-printed JSON.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        Ok(())
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "The accuracy on the test set is {:.2}", self.accuracy)?;
        writeln!(f, "The confusion matrix is")?;
        writeln!(f, "{}", self.confusion)?;
        write!(f, "The no information rate is {:.2}", self.no_information_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TestReport {
        let truth = [0, 0, 1, 1];
        let predicted = [0, 1, 1, 1];
        TestReport {
            accuracy: sentilstm_core::accuracy(&truth, &predicted),
            confusion: ConfusionMatrix::from_predictions(&truth, &predicted),
            no_information_rate: sentilstm_core::no_information_rate(&truth),
        }
    }

    #[test]
    fn test_display() {
        let text = sample().to_string();
        assert!(text.starts_with("The accuracy on the test set is 75.00\n"));
        assert!(text.contains("[[1 1]\n [0 2]]"));
        assert!(text.ends_with("The no information rate is 50.00"));
    }

    #[test]
    fn test_write_json() {
        let report = RunReport {
            vocab_size: 4,
            seq_len: 3,
            embedding_coverage: 4,
            epochs: vec![EpochReport {
                epoch: 0,
                train_loss: 0.69,
                train_accuracy: 50.0,
                val_accuracy: 75.0,
                saved: true,
            }],
            best_val_accuracy: Some(75.0),
            checkpoint: PathBuf::from("best.safetensors"),
            test: sample(),
        };
        let path = std::env::temp_dir().join(format!("sentilstm-report-{}.json", std::process::id()));
        report.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["epochs"][0]["saved"], true);
        assert_eq!(value["test"]["confusion"]["counts"][1][1], 2);
        std::fs::remove_file(path).ok();
    }
}
