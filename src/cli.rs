use crate::dataset::{DATASETS, DatasetKind};
use crate::error::{Error, Result};
use crate::model::{ARCHITECTURES, Architecture};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

pub const TRAIN_HELP: &str = "\
Trains a convolutional classifier on the training partition of a dataset.

USAGE:
    train --dataset <NAME> --model <NAME> --model_path <PATH> --plot_path <PATH>

FLAGS:
    -h, --help                      Show this help message and exit

OPTIONS:
    --dataset <NAME>                Dataset to train on (MNIST, FashionMNIST)
    --model <NAME>                  Architecture to train (NN1, NN2, NN3, NN4, NN5)
    --model_path <PATH>             Where to save the trained weights
                                    (the extension is replaced by `.mpk`)
    --plot_path <PATH>              Where to save the loss/accuracy vs epoch plot (PNG)

The IDX files are read from `data/<dataset>/raw/`.
";

pub const EVALUATE_HELP: &str = "\
Evaluates trained weights on the test partition of a dataset.

USAGE:
    evaluate --dataset <NAME> --model <NAME> --model_path <PATH> --confusion_matrix_path <PATH>

FLAGS:
    -h, --help                      Show this help message and exit

OPTIONS:
    --dataset <NAME>                Dataset to test on (MNIST, FashionMNIST)
    --model <NAME>                  Architecture of the weights (NN1, NN2, NN3, NN4, NN5)
    --model_path <PATH>             Path the weights were saved to
    --confusion_matrix_path <PATH>  Where to save the confusion matrix plot (PNG)

The IDX files are read from `data/<dataset>/raw/`.
";

/// Arguments shared by both entry points.
#[derive(Debug)]
pub struct CommonArgs {
    pub dataset: DatasetKind,
    pub model: Architecture,
    pub model_path: PathBuf,
}

impl CommonArgs {
    pub fn dataset_name(&self) -> &'static str {
        DATASETS.name_of(self.dataset).unwrap_or("unknown")
    }

    pub fn model_name(&self) -> &'static str {
        ARCHITECTURES.name_of(self.model).unwrap_or("unknown")
    }

    fn parse(pargs: &mut pico_args::Arguments) -> Result<Self> {
        let dataset: String = pargs.value_from_str("--dataset")?;
        let model: String = pargs.value_from_str("--model")?;
        Ok(Self {
            dataset: DatasetKind::from_name(&dataset)?,
            model: Architecture::from_name(&model)?,
            model_path: pargs.value_from_os_str("--model_path", parse_path)?,
        })
    }
}

#[derive(Debug)]
pub struct TrainArgs {
    pub common: CommonArgs,
    pub plot_path: PathBuf,
}

impl TrainArgs {
    /// Parses the process arguments; prints the help and exits on `-h`/`--help`.
    pub fn parse() -> Result<Self> {
        let mut pargs = pico_args::Arguments::from_env();
        if pargs.contains(["-h", "--help"]) {
            println!("{TRAIN_HELP}");
            std::process::exit(0);
        }
        Self::from_arguments(pargs)
    }

    pub fn from_args(args: Vec<OsString>) -> Result<Self> {
        Self::from_arguments(pico_args::Arguments::from_vec(args))
    }

    fn from_arguments(mut pargs: pico_args::Arguments) -> Result<Self> {
        let args = Self {
            common: CommonArgs::parse(&mut pargs)?,
            plot_path: pargs.value_from_os_str("--plot_path", parse_path)?,
        };
        finish(pargs)?;
        Ok(args)
    }
}

#[derive(Debug)]
pub struct EvaluateArgs {
    pub common: CommonArgs,
    pub confusion_matrix_path: PathBuf,
}

impl EvaluateArgs {
    /// Parses the process arguments; prints the help and exits on `-h`/`--help`.
    pub fn parse() -> Result<Self> {
        let mut pargs = pico_args::Arguments::from_env();
        if pargs.contains(["-h", "--help"]) {
            println!("{EVALUATE_HELP}");
            std::process::exit(0);
        }
        Self::from_arguments(pargs)
    }

    pub fn from_args(args: Vec<OsString>) -> Result<Self> {
        Self::from_arguments(pico_args::Arguments::from_vec(args))
    }

    fn from_arguments(mut pargs: pico_args::Arguments) -> Result<Self> {
        let args = Self {
            common: CommonArgs::parse(&mut pargs)?,
            confusion_matrix_path: pargs
                .value_from_os_str("--confusion_matrix_path", parse_path)?,
        };
        finish(pargs)?;
        Ok(args)
    }
}

fn parse_path(s: &OsStr) -> std::result::Result<PathBuf, &'static str> {
    Ok(s.into())
}

fn finish(pargs: pico_args::Arguments) -> Result<()> {
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        return Err(Error::UnusedArguments(remaining));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn train_arguments_are_parsed() {
        let parsed = TrainArgs::from_args(args(&[
            "--dataset",
            "FashionMNIST",
            "--model",
            "NN4",
            "--model_path",
            "weights/nn4",
            "--plot_path",
            "plots/nn4.png",
        ]))
        .unwrap();
        assert_eq!(parsed.common.dataset, DatasetKind::FashionMnist);
        assert_eq!(parsed.common.model, Architecture::Nn4);
        assert_eq!(parsed.common.model_name(), "NN4");
        assert_eq!(parsed.common.dataset_name(), "FashionMNIST");
        assert_eq!(parsed.common.model_path, PathBuf::from("weights/nn4"));
        assert_eq!(parsed.plot_path, PathBuf::from("plots/nn4.png"));
    }

    #[test]
    fn evaluate_arguments_are_parsed() {
        let parsed = EvaluateArgs::from_args(args(&[
            "--model",
            "NN1",
            "--dataset",
            "MNIST",
            "--confusion_matrix_path",
            "cm.png",
            "--model_path",
            "nn1.mpk",
        ]))
        .unwrap();
        assert_eq!(parsed.common.dataset, DatasetKind::Mnist);
        assert_eq!(parsed.confusion_matrix_path, PathBuf::from("cm.png"));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let result = TrainArgs::from_args(args(&[
            "--dataset",
            "MNIST",
            "--model",
            "ResNet",
            "--model_path",
            "m",
            "--plot_path",
            "p",
        ]));
        assert!(matches!(
            result,
            Err(Error::UnknownIdentifier { kind: "model", .. })
        ));
    }

    #[test]
    fn missing_and_unused_arguments_are_rejected() {
        let missing = EvaluateArgs::from_args(args(&["--dataset", "MNIST", "--model", "NN1"]));
        assert!(matches!(missing, Err(Error::Cli(_))));

        let unused = EvaluateArgs::from_args(args(&[
            "--dataset",
            "MNIST",
            "--model",
            "NN1",
            "--model_path",
            "m",
            "--confusion_matrix_path",
            "c",
            "--epochs",
        ]));
        assert!(matches!(unused, Err(Error::UnusedArguments(_))));
    }
}
