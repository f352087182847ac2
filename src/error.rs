use burn::record::RecorderError;
use std::ffi::OsString;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unrecognized {kind} `{name}`, expected one of: {expected}")]
    UnknownIdentifier {
        kind: &'static str,
        name: String,
        expected: String,
    },

    #[error("checkpoint not found at {path:?}")]
    CheckpointNotFound { path: PathBuf },

    /// An empty `expected` (or `found`) means the parameter is missing on that side.
    #[error("checkpoint shape mismatch for `{parameter}`: expected {expected:?}, found {found:?}")]
    CheckpointShapeMismatch {
        parameter: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("record error: {0}")]
    Record(#[from] RecorderError),

    #[error("dataset file not found at {path:?}")]
    DatasetNotFound { path: PathBuf },

    #[error("malformed dataset file {path:?}: {reason}")]
    MalformedDataset { path: PathBuf, reason: String },

    #[error("the {split} split is empty ({num_items} items, ratio {ratio})")]
    EmptySplit {
        split: &'static str,
        num_items: usize,
        ratio: f64,
    },

    #[error("label {label} is outside of the {num_classes} known classes")]
    LabelOutOfRange { label: usize, num_classes: usize },

    #[error("tensor data conversion failed: {0}")]
    TensorData(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid arguments: {0}")]
    Cli(#[from] pico_args::Error),

    #[error("unused arguments: {0:?}")]
    UnusedArguments(Vec<OsString>),
}
