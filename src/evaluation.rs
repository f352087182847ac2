use crate::config::EvaluationConfig;
use crate::dataset::{ImageBatcher, ImageItem};
use crate::error::{Error, Result};
use crate::logging::RunContext;
use crate::metrics::{ClassificationReport, ConfusionMatrix};
use crate::model::Classifier;
use crate::training::Dataloader;
use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::Dataset;
use burn::prelude::*;

/// Outcome of running a model over a labeled partition.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub predictions: Vec<usize>,
    pub targets: Vec<usize>,
    pub confusion_matrix: ConfusionMatrix,
    pub report: ClassificationReport,
}

fn to_labels<B: Backend>(tensor: Tensor<B, 1, Int>) -> Result<Vec<usize>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map(|labels| labels.into_iter().map(|label| label as usize).collect())
        .map_err(|err| Error::TensorData(format!("{err:?}")))
}

/// Predicts a class for every item of `dataset` and scores the predictions.
///
/// The report and the confusion matrix take the predictions as their first ("actual")
/// argument and the ground truth as their second ("predicted") one, the order in which
/// the historical reports of these models were produced.
pub fn evaluate<B, D>(
    ctx: &RunContext,
    dataset: D,
    class_names: &[&str],
    model: &Classifier<B>,
    config: &EvaluationConfig,
    device: &B::Device,
) -> Result<Evaluation>
where
    B: Backend,
    D: Dataset<ImageItem> + 'static,
{
    let _run = ctx.enter();
    tracing::info!("testing model on {} items", dataset.len());

    let dataloader: Dataloader<B> = DataLoaderBuilder::new(ImageBatcher::default())
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(dataset);

    let mut predictions = Vec::with_capacity(dataloader.num_items());
    let mut targets = Vec::with_capacity(dataloader.num_items());
    for batch in dataloader.iter() {
        let batch = batch.to_device(device);
        let [batch_size, ..] = batch.images.dims();
        let predicted = model.forward(batch.images).argmax(1).reshape([batch_size]);
        predictions.extend(to_labels(predicted)?);
        targets.extend(to_labels(batch.targets)?);
    }

    let confusion_matrix = ConfusionMatrix::from_labels(&predictions, &targets, class_names.len())?;
    let report = ClassificationReport::new(&confusion_matrix, class_names);
    tracing::info!("\n{report}");

    Ok(Evaluation {
        predictions,
        targets,
        confusion_matrix,
        report,
    })
}
