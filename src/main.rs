use std::{env, fs};

use anyhow::{Context, Result};
use log::info;
use machine_learning::{
    specs::TrainerSpec,
    training::{LogReporter, TrainerBuilder},
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let spec = match env::args().nth(1) {
        Some(path) => {
            let json =
                fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
            TrainerSpec::from_json(&json).with_context(|| format!("parsing config {path}"))?
        }
        None => {
            info!("no config given, using the walkthrough defaults");
            TrainerSpec::walkthrough()
        }
    };

    let builder = TrainerBuilder::new();
    let mut trainer = builder.build(&spec).context("building the trainer")?;
    let mut source = builder
        .build_source(&spec)
        .context("building the dataset")?;

    let summary = trainer
        .train(&mut source, &mut LogReporter)
        .context("training")?;
    info!(steps = summary.steps; "training finished");

    let eval = trainer.evaluate(&mut source).context("evaluating")?;
    info!(
        "loss {:.4}, accuracy {:.2}% over {} samples",
        eval.loss,
        eval.accuracy * 100.,
        eval.samples
    );

    if let Some(sample) = source.dataset().get(0) {
        let proba = trainer
            .predict_proba(sample.inputs)
            .context("predicting a sample")?;

        info!("class probabilities of a sample labelled {}", sample.labels[0]);
        for (class, p) in proba.row(0).iter().enumerate() {
            info!("  {class}: {p:.4}");
        }
    }

    Ok(())
}
