use anyhow::Context;
use burn::config::Config;
use burn::tensor::backend::AutodiffBackend;
use burn_convnets::backend::{BACKEND_NAME, MainAutoBackend, MainDevice};
use burn_convnets::cli::TrainArgs;
use burn_convnets::prelude::*;
use burn_convnets::{checkpoint, logging, plot};

pub fn launch<AutoB: AutodiffBackend + MainDevice>(args: TrainArgs) -> anyhow::Result<()> {
    let ctx = RunContext::new(
        "train",
        args.common.dataset_name(),
        args.common.model_name(),
    );
    let config = TrainingConfig::default();
    let model_config = args.common.model.config();

    let dataset = ImageDataset::train(args.common.dataset, &config.data_dir)
        .context("failed to load the training partition")?;
    let (model, history) = train::<AutoB, _>(
        &ctx,
        dataset,
        &model_config,
        &config,
        AutoB::main_device(),
    )
    .context("training failed")?;

    let _run = ctx.enter();
    checkpoint::save_checkpoint(&model, &args.common.model_path)
        .context("failed to save the model weights")?;
    let config_path = args.common.model_path.with_extension("json");
    config
        .save(&config_path)
        .with_context(|| format!("failed to save the training config to {config_path:?}"))?;
    plot::render_history(&history, &args.plot_path).context("failed to render the plot")?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    logging::init();
    tracing::info!("using the {BACKEND_NAME} backend");
    let args = TrainArgs::parse()?;
    launch::<MainAutoBackend>(args)
}
