//! Classification metrics for the final report.

use std::fmt;

use serde::Serialize;

use crate::config::NUM_CLASSES;

/// Percentage of positions where `predicted` equals `truth`, in `[0, 100]`.
/// Empty input scores 0.
pub fn accuracy(truth: &[u32], predicted: &[u32]) -> f64 {
    let total = truth.len().min(predicted.len());
    if total == 0 {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    100.0 * correct as f64 / total as f64
}

/// Accuracy of always predicting the most frequent label, in `[0, 100]`.
pub fn no_information_rate(labels: &[u32]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; NUM_CLASSES];
    for &label in labels {
        if let Some(count) = counts.get_mut(label as usize) {
            *count += 1;
        }
    }
    let majority = counts.iter().copied().max().unwrap_or(0);
    100.0 * majority as f64 / labels.len() as f64
}

/// Counts indexed by `[true label][predicted label]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; NUM_CLASSES]; NUM_CLASSES],
}

impl ConfusionMatrix {
    /// Tally label pairs; pairs with a class outside `0..NUM_CLASSES` are ignored.
    pub fn from_predictions(truth: &[u32], predicted: &[u32]) -> Self {
        let mut matrix = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            if let Some(cell) = matrix
                .counts
                .get_mut(t as usize)
                .and_then(|row| row.get_mut(p as usize))
            {
                *cell += 1;
            }
        }
        matrix
    }

    pub fn get(&self, truth: usize, predicted: usize) -> usize {
        self.counts[truth][predicted]
    }

    /// Number of tallied examples.
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Diagonal over total, as a percentage.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..NUM_CLASSES).map(|c| self.counts[c][c]).sum();
        100.0 * correct as f64 / total as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .counts
            .iter()
            .flatten()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(1);

        write!(f, "[")?;
        for (i, row) in self.counts.iter().enumerate() {
            if i > 0 {
                write!(f, "\n ")?;
            }
            write!(f, "[")?;
            for (j, count) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{count:>width$}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}
