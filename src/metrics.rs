use crate::error::{Error, Result};
use burn::data::dataloader::Progress;
use burn::prelude::*;
use burn::train::ClassificationOutput;
use burn::train::metric::{
    AccuracyMetric, Adaptor, LossInput, LossMetric, Metric, MetricMetadata, Numeric,
};
use std::fmt;

/// Loss and accuracy over the batches of one epoch, weighted by sample count.
pub struct EpochMetrics<B: Backend> {
    loss: LossMetric<B>,
    accuracy: AccuracyMetric<B>,
    meta: MetricMetadata,
}

impl<B: Backend> EpochMetrics<B> {
    pub fn new(epoch: usize, num_epochs: usize, num_items: usize, lr: Option<f64>) -> Self {
        Self {
            loss: LossMetric::new(),
            accuracy: AccuracyMetric::new(),
            meta: MetricMetadata {
                progress: Progress::new(0, num_items),
                epoch,
                epoch_total: num_epochs,
                iteration: 0,
                lr,
            },
        }
    }

    /// Accounts for one batch.
    pub fn update(&mut self, output: &ClassificationOutput<B>) {
        let [batch_size] = output.targets.dims();
        self.meta.iteration += 1;
        self.meta.progress.items_processed += batch_size;

        self.accuracy.update(&output.adapt(), &self.meta);
        // the loss metric weights each update by the length of its input,
        // so the batch mean is repeated once per sample
        let loss = output.loss.clone().repeat_dim(0, batch_size);
        self.loss.update(&LossInput::new(loss), &self.meta);
    }

    pub fn num_items(&self) -> usize {
        self.meta.progress.items_processed
    }

    /// Mean loss per sample; 0 before any update.
    pub fn loss(&self) -> f64 {
        if self.num_items() == 0 {
            return 0.0;
        }
        self.loss.running_value().current()
    }

    /// Fraction of correctly classified samples, in [0, 1].
    pub fn accuracy(&self) -> f64 {
        if self.num_items() == 0 {
            return 0.0;
        }
        self.accuracy.running_value().current() / 100.0
    }
}

/// Per-epoch metrics, one entry per completed epoch in each sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingHistory {
    pub train_loss: Vec<f64>,
    pub train_accuracy: Vec<f64>,
    pub validation_loss: Vec<f64>,
    pub validation_accuracy: Vec<f64>,
}

impl TrainingHistory {
    pub fn push<TrainB: Backend, ValidB: Backend>(
        &mut self,
        train: &EpochMetrics<TrainB>,
        validation: &EpochMetrics<ValidB>,
    ) {
        self.train_loss.push(train.loss());
        self.train_accuracy.push(train.accuracy());
        self.validation_loss.push(validation.loss());
        self.validation_accuracy.push(validation.accuracy());
    }

    /// Number of recorded epochs.
    pub fn len(&self) -> usize {
        self.train_loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counts of (actual, predicted) label pairs.
///
/// Row `i`, column `j` counts the samples labeled `i` on the actual side and `j` on the
/// predicted side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfusionMatrix {
    num_classes: usize,
    counts: Vec<usize>,
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[usize], predicted: &[usize], num_classes: usize) -> Result<Self> {
        debug_assert_eq!(actual.len(), predicted.len());
        let mut counts = vec![0; num_classes * num_classes];
        for (&a, &p) in actual.iter().zip(predicted) {
            if let Some(&label) = [a, p].iter().find(|label| **label >= num_classes) {
                return Err(Error::LabelOutOfRange { label, num_classes });
            }
            counts[a * num_classes + p] += 1;
        }
        Ok(Self {
            num_classes,
            counts,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual * self.num_classes + predicted]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Largest single cell count.
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    fn row_sum(&self, actual: usize) -> usize {
        (0..self.num_classes).map(|p| self.count(actual, p)).sum()
    }

    fn column_sum(&self, predicted: usize) -> usize {
        (0..self.num_classes).map(|a| self.count(a, predicted)).sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassScores {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision, recall and F1, with accuracy and averaged rows.
///
/// Undefined ratios (zero denominators) are reported as 0.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl ClassificationReport {
    pub fn new(matrix: &ConfusionMatrix, class_names: &[&str]) -> Self {
        debug_assert_eq!(matrix.num_classes(), class_names.len());
        let classes: Vec<ClassScores> = class_names
            .iter()
            .enumerate()
            .map(|(class, name)| {
                let true_positives = matrix.count(class, class);
                let precision = ratio(true_positives, matrix.column_sum(class));
                let recall = ratio(true_positives, matrix.row_sum(class));
                ClassScores {
                    name: name.to_string(),
                    precision,
                    recall,
                    f1: f1(precision, recall),
                    support: matrix.row_sum(class),
                }
            })
            .collect();

        let total = matrix.total();
        let correct = (0..matrix.num_classes()).map(|c| matrix.count(c, c)).sum();
        let num_classes = classes.len().max(1) as f64;
        let average = |name: &str, weight: &dyn Fn(&ClassScores) -> f64, norm: f64| {
            let mean = |score: fn(&ClassScores) -> f64| {
                if norm == 0.0 {
                    0.0
                } else {
                    classes.iter().map(|c| score(c) * weight(c)).sum::<f64>() / norm
                }
            };
            ClassScores {
                name: name.to_string(),
                precision: mean(|c| c.precision),
                recall: mean(|c| c.recall),
                f1: mean(|c| c.f1),
                support: total,
            }
        };
        let macro_avg = average("macro avg", &|_| 1.0, num_classes);
        let weighted_avg = average("weighted avg", &|c| c.support as f64, total as f64);

        Self {
            accuracy: ratio(correct, total),
            classes,
            macro_avg,
            weighted_avg,
        }
    }

    pub fn total_support(&self) -> usize {
        self.weighted_avg.support
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.len())
            .chain([self.weighted_avg.name.len()])
            .max()
            .unwrap_or(0);
        let row = |f: &mut fmt::Formatter<'_>, c: &ClassScores| {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.name, c.precision, c.recall, c.f1, c.support
            )
        };

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &self.classes {
            row(f, class)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.total_support()
        )?;
        row(f, &self.macro_avg)?;
        row(f, &self.weighted_avg)
    }
}
