use burn::backend::{Autodiff, NdArray};
use burn::data::dataset::{Dataset, InMemDataset};
use burn_convnets::dataset::{HEIGHT, WIDTH};
use burn_convnets::prelude::*;

type TestBackend = NdArray<f32>;
type TestAutodiffBackend = Autodiff<TestBackend>;

/// Dark images for class 0, bright images for class 1.
fn synthetic_dataset(len: usize) -> InMemDataset<ImageItem> {
    let items = (0..len)
        .map(|i| {
            let label = (i % 2) as u8;
            let brightness = if label == 0 { 16 } else { 240 };
            ImageItem {
                pixels: vec![brightness; HEIGHT * WIDTH],
                label,
            }
        })
        .collect();
    InMemDataset::new(items)
}

#[test]
fn one_epoch_of_training_records_one_entry_per_metric() {
    let ctx = RunContext::new("train", "synthetic", "NN1");
    let config = TrainingConfig::default()
        .with_num_epochs(1)
        .with_num_workers(1);

    let (_model, history) = train::<TestAutodiffBackend, _>(
        &ctx,
        synthetic_dataset(128),
        &Architecture::Nn1.config(),
        &config,
        Default::default(),
    )
    .unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history.train_loss.len(), 1);
    assert_eq!(history.train_accuracy.len(), 1);
    assert_eq!(history.validation_loss.len(), 1);
    assert_eq!(history.validation_accuracy.len(), 1);
    for accuracy in history.train_accuracy.iter().chain(&history.validation_accuracy) {
        assert!((0.0..=1.0).contains(accuracy), "accuracy out of range: {accuracy}");
    }
    for loss in history.train_loss.iter().chain(&history.validation_loss) {
        assert!(*loss >= 0.0, "negative loss: {loss}");
    }
}

#[test]
fn evaluating_a_fresh_checkpoint_counts_every_item() {
    let dir = temp_dir::TempDir::new().unwrap();
    let device = Default::default();
    let model_config = Architecture::Nn1.config();

    let model = model_config.init::<TestBackend>(&device);
    let written = save_checkpoint(&model, &dir.child("nn1")).unwrap();
    assert!(written.exists());
    let model = load_checkpoint::<TestBackend>(&model_config, &dir.child("nn1"), &device).unwrap();

    let ctx = RunContext::new("evaluate", "synthetic", "NN1");
    let dataset = synthetic_dataset(10);
    assert_eq!(dataset.len(), 10);
    let evaluation = evaluate(
        &ctx,
        dataset,
        DatasetKind::Mnist.classes(),
        &model,
        &EvaluationConfig::default().with_batch_size(4),
        &device,
    )
    .unwrap();

    assert_eq!(evaluation.confusion_matrix.total(), 10);
    assert_eq!(evaluation.predictions.len(), 10);
    assert_eq!(evaluation.targets.len(), 10);
    assert_eq!(evaluation.report.total_support(), 10);
}

#[test]
fn unknown_names_are_rejected() {
    assert!(matches!(
        DatasetKind::from_name("CIFAR10"),
        Err(Error::UnknownIdentifier { kind: "dataset", .. })
    ));
    assert!(matches!(
        Architecture::from_name("nn1"),
        Err(Error::UnknownIdentifier { kind: "model", .. })
    ));
}
