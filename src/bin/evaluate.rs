use anyhow::Context;
use burn::prelude::*;
use burn_convnets::backend::{BACKEND_NAME, MainBackend, MainDevice};
use burn_convnets::cli::EvaluateArgs;
use burn_convnets::prelude::*;
use burn_convnets::{logging, plot};

pub fn launch<B: Backend + MainDevice>(args: EvaluateArgs) -> anyhow::Result<()> {
    let ctx = RunContext::new(
        "evaluate",
        args.common.dataset_name(),
        args.common.model_name(),
    );
    let config = EvaluationConfig::default();
    let device = B::main_device();

    let dataset = ImageDataset::test(args.common.dataset, &config.data_dir)
        .context("failed to load the test partition")?;
    let model = {
        let _run = ctx.enter();
        load_checkpoint::<B>(&args.common.model.config(), &args.common.model_path, &device)
            .context("failed to load the model weights")?
    };
    let classes = args.common.dataset.classes();
    let evaluation = evaluate(&ctx, dataset, classes, &model, &config, &device)
        .context("evaluation failed")?;

    let _run = ctx.enter();
    plot::render_confusion_matrix(&evaluation.confusion_matrix, &args.confusion_matrix_path)
        .context("failed to render the confusion matrix")?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    logging::init();
    tracing::info!("using the {BACKEND_NAME} backend");
    let args = EvaluateArgs::parse()?;
    launch::<MainBackend>(args)
}
