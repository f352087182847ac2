pub mod backend;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod plot;
pub mod registry;
pub mod training;

pub mod prelude {
    pub use crate::checkpoint::{load_checkpoint, save_checkpoint};
    pub use crate::config::{EvaluationConfig, TrainingConfig};
    pub use crate::dataset::{DatasetKind, ImageDataset, ImageItem};
    pub use crate::error::{Error, Result};
    pub use crate::evaluation::{Evaluation, evaluate};
    pub use crate::logging::RunContext;
    pub use crate::metrics::{ClassificationReport, ConfusionMatrix, TrainingHistory};
    pub use crate::model::{Architecture, Classifier, ClassifierConfig};
    pub use crate::training::train;
}
