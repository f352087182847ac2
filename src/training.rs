use crate::config::TrainingConfig;
use crate::dataset::{ImageBatch, ImageBatcher, ImageItem, split_train_validation};
use crate::error::{Error, Result};
use crate::logging::RunContext;
use crate::metrics::{EpochMetrics, TrainingHistory};
use crate::model::{Classifier, ClassifierConfig};
use burn::prelude::*;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    data::dataset::Dataset,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;
use std::time::Instant;

pub type Dataloader<B> = Arc<dyn DataLoader<B, ImageBatch<B>> + 'static>;

/// Trains a freshly initialized model on `dataset`, the training partition.
///
/// The partition is shuffled and split into training and validation items; every epoch
/// runs one optimizer step per training batch, followed by a gradient-free pass over the
/// validation batches.
pub fn train<AutoB, D>(
    ctx: &RunContext,
    dataset: D,
    model_config: &ClassifierConfig,
    config: &TrainingConfig,
    device: AutoB::Device,
) -> Result<(Classifier<AutoB>, TrainingHistory)>
where
    AutoB: AutodiffBackend,
    D: Dataset<ImageItem> + 'static,
{
    let _run = ctx.enter();
    AutoB::seed(&device, config.seed);

    let num_items = dataset.len();
    let (train_split, valid_split) =
        split_train_validation(dataset, config.train_split, config.seed);
    for (split, len) in [("train", train_split.len()), ("validation", valid_split.len())] {
        if len == 0 {
            return Err(Error::EmptySplit {
                split,
                num_items,
                ratio: config.train_split,
            });
        }
    }
    tracing::info!(
        "split {num_items} items into {} training and {} validation items",
        train_split.len(),
        valid_split.len()
    );

    let batcher = ImageBatcher::default();
    let dataloader_train: Dataloader<AutoB> = DataLoaderBuilder::new(batcher.clone())
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(train_split);
    let dataloader_valid: Dataloader<AutoB::InnerBackend> = DataLoaderBuilder::new(batcher)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(valid_split);

    let mut model = model_config.init::<AutoB>(&device);
    let mut optim = config.optimizer.init::<AutoB, Classifier<AutoB>>();
    let mut history = TrainingHistory::default();

    tracing::info!("training model");
    let start = Instant::now();
    for epoch in 1..config.num_epochs + 1 {
        let (trained, train_metrics) =
            epoch_train(&dataloader_train, model, &mut optim, config, epoch, &device);
        model = trained;
        let valid_metrics = epoch_valid(&dataloader_valid, &model.valid(), config, epoch, &device);

        tracing::info!(
            "EPOCH: {epoch}/{}\n    train loss: {:.4}, train accuracy: {:.4}\n    validation loss: {:.4}, validation accuracy: {:.4}",
            config.num_epochs,
            train_metrics.loss(),
            train_metrics.accuracy(),
            valid_metrics.loss(),
            valid_metrics.accuracy(),
        );
        history.push(&train_metrics, &valid_metrics);
    }
    tracing::info!(
        "total time taken to train the model: {:.2}",
        start.elapsed().as_secs_f64()
    );

    Ok((model, history))
}

/// One pass over the training batches, one optimizer step per batch.
pub fn epoch_train<AutoB, O>(
    dataloader: &Dataloader<AutoB>,
    mut model: Classifier<AutoB>,
    optim: &mut O,
    config: &TrainingConfig,
    epoch: usize,
    device: &AutoB::Device,
) -> (Classifier<AutoB>, EpochMetrics<AutoB>)
where
    AutoB: AutodiffBackend,
    O: Optimizer<Classifier<AutoB>, AutoB>,
{
    let mut metrics = EpochMetrics::new(
        epoch,
        config.num_epochs,
        dataloader.num_items(),
        Some(config.lr),
    );

    for batch in dataloader.iter() {
        let batch = batch.to_device(device);
        let output = model.forward_classification(batch.images, batch.targets);
        metrics.update(&output);

        let grads = output.loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(config.lr, model, grads);
    }
    tracing::debug!("trained on {} items", metrics.num_items());

    (model, metrics)
}

/// Loss and accuracy of `model` over the validation batches, without gradients.
pub fn epoch_valid<B: Backend>(
    dataloader: &Dataloader<B>,
    model: &Classifier<B>,
    config: &TrainingConfig,
    epoch: usize,
    device: &B::Device,
) -> EpochMetrics<B> {
    let mut metrics = EpochMetrics::new(epoch, config.num_epochs, dataloader.num_items(), None);

    for batch in dataloader.iter() {
        let batch = batch.to_device(device);
        let output = model.forward_classification(batch.images, batch.targets);
        metrics.update(&output);
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{HEIGHT, WIDTH};
    use crate::model::Architecture;
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataset::InMemDataset;

    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn items(len: usize) -> Vec<ImageItem> {
        (0..len)
            .map(|i| ImageItem {
                pixels: vec![if i % 2 == 0 { 10 } else { 250 }; HEIGHT * WIDTH],
                label: (i % 2) as u8,
            })
            .collect()
    }

    fn weights<B: Backend>(model: &Classifier<B>) -> Vec<f32> {
        model.body[0]
            .weight
            .val()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap()
    }

    #[test]
    fn training_epoch_updates_the_parameters() {
        let device = Default::default();
        let config = TrainingConfig::default();
        let dataloader: Dataloader<TestAutodiffBackend> =
            DataLoaderBuilder::new(ImageBatcher::default())
                .batch_size(16)
                .build(InMemDataset::new(items(32)));

        let model = Architecture::Nn1
            .config()
            .init::<TestAutodiffBackend>(&device);
        let before = weights(&model);
        let mut optim = config
            .optimizer
            .init::<TestAutodiffBackend, Classifier<TestAutodiffBackend>>();

        let (model, metrics) = epoch_train(&dataloader, model, &mut optim, &config, 1, &device);

        assert_eq!(metrics.num_items(), 32);
        assert!((0.0..=1.0).contains(&metrics.accuracy()));
        assert!(metrics.loss() >= 0.0);
        let after = weights(&model);
        assert_eq!(before.len(), after.len());
        assert!(before.iter().zip(&after).any(|(b, a)| b != a));
    }

    #[test]
    fn validation_epoch_counts_every_item() {
        let device = Default::default();
        let dataloader: Dataloader<NdArray<f32>> = DataLoaderBuilder::new(ImageBatcher::default())
            .batch_size(4)
            .build(InMemDataset::new(items(10)));
        let model = Architecture::Nn1.config().init::<NdArray<f32>>(&device);

        let metrics = epoch_valid(&dataloader, &model, &TrainingConfig::default(), 1, &device);
        assert_eq!(metrics.num_items(), 10);
        assert!(metrics.loss() > 0.0);
    }

    #[test]
    fn empty_validation_split_is_rejected() {
        let items = vec![
            ImageItem {
                pixels: vec![0; HEIGHT * WIDTH],
                label: 0,
            };
            1
        ];
        let result = train::<TestAutodiffBackend, _>(
            &RunContext::new("test", "synthetic", "NN1"),
            InMemDataset::new(items),
            &Architecture::Nn1.config(),
            &TrainingConfig::default().with_train_split(1.0),
            Default::default(),
        );
        assert!(matches!(
            result,
            Err(Error::EmptySplit {
                split: "validation",
                ..
            })
        ));
    }
}
