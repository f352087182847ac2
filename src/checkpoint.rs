use crate::error::{Error, Result};
use crate::model::{Classifier, ClassifierConfig, ClassifierRecord};
use burn::nn::LinearRecord;
use burn::nn::conv::Conv2dRecord;
use burn::prelude::*;
use burn::record::{FileRecorder, FullPrecisionSettings, NamedMpkFileRecorder, Recorder, RecorderError};
use std::path::{Path, PathBuf};

/// Full precision, so that a reloaded model reproduces the saved model's outputs.
pub type RecorderTy = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Path the recorder actually writes to for `path` (the extension is replaced).
pub fn checkpoint_path<B: Backend>(path: &Path) -> PathBuf {
    path.with_extension(<RecorderTy as FileRecorder<B>>::file_extension())
}

/// Saves the model parameters, returning the path written to.
pub fn save_checkpoint<B: Backend>(model: &Classifier<B>, path: &Path) -> Result<PathBuf> {
    let path_ext = checkpoint_path::<B>(path);
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!("saving model weights to {path_ext:?}");
    model
        .clone()
        .save_file(path.to_path_buf(), &RecorderTy::new()) // ext added automatically
        .map_err(Error::Record)?;
    Ok(path_ext)
}

/// Initializes a model from `model_config` and loads the parameters saved at `path` into it.
///
/// Every parameter of the checkpoint must match the shape the configuration declares.
pub fn load_checkpoint<B: Backend>(
    model_config: &ClassifierConfig,
    path: &Path,
    device: &B::Device,
) -> Result<Classifier<B>> {
    let path_ext = checkpoint_path::<B>(path);
    if !path_ext.exists() {
        return Err(Error::CheckpointNotFound { path: path_ext });
    }
    tracing::info!("loading model weights from {path_ext:?}");

    let record: ClassifierRecord<B> = RecorderTy::new()
        .load(path.to_path_buf(), device) // ext added automatically
        .map_err(|err| match err {
            RecorderError::FileNotFound(_) => Error::CheckpointNotFound {
                path: path_ext.clone(),
            },
            err => Error::Record(err),
        })?;

    let model = model_config.init::<B>(device);
    check_shapes(
        &record_shapes(&model.clone().into_record()),
        &record_shapes(&record),
    )?;

    Ok(model.load_record(record))
}

type ParamShapes = Vec<(String, Vec<usize>)>;

fn conv_shapes<B: Backend>(prefix: &str, records: &[Conv2dRecord<B>], shapes: &mut ParamShapes) {
    for (i, conv) in records.iter().enumerate() {
        shapes.push((format!("{prefix}.{i}.weight"), conv.weight.dims().to_vec()));
        if let Some(bias) = &conv.bias {
            shapes.push((format!("{prefix}.{i}.bias"), bias.dims().to_vec()));
        }
    }
}

fn linear_shapes<B: Backend>(prefix: &str, records: &[LinearRecord<B>], shapes: &mut ParamShapes) {
    for (i, linear) in records.iter().enumerate() {
        shapes.push((format!("{prefix}.{i}.weight"), linear.weight.dims().to_vec()));
        if let Some(bias) = &linear.bias {
            shapes.push((format!("{prefix}.{i}.bias"), bias.dims().to_vec()));
        }
    }
}

/// Named parameter shapes, in declaration order.
fn record_shapes<B: Backend>(record: &ClassifierRecord<B>) -> ParamShapes {
    let mut shapes = Vec::new();
    conv_shapes("body", &record.body, &mut shapes);
    linear_shapes("dense", &record.dense, &mut shapes);
    conv_shapes("pointwise", &record.pointwise, &mut shapes);
    shapes
}

fn check_shapes(expected: &ParamShapes, found: &ParamShapes) -> Result<()> {
    let shape_of = |shapes: &ParamShapes, name: &str| {
        shapes
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, shape)| shape.clone())
            .unwrap_or_default()
    };

    for (parameter, shape) in expected.iter().chain(found) {
        let expected_shape = shape_of(expected, parameter);
        let found_shape = shape_of(found, parameter);
        if expected_shape != found_shape {
            tracing::debug!("checkpoint parameter `{parameter}` has shape {shape:?}");
            return Err(Error::CheckpointShapeMismatch {
                parameter: parameter.clone(),
                expected: expected_shape,
                found: found_shape,
            });
        }
    }
    Ok(())
}
