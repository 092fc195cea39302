mod args;
mod mnist;
mod output;
mod plot;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use env_logger::Env;
use log::info;
use machine_learning::{
    arch::{
        Sequential,
        loss::{CrossEntropy, LossFn, Mse},
    },
    dataset::Dataset,
    training::{MetricsRecorder, SvrgTrainer, SystemClock},
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    args::{Args, Loss},
    output::TrainingOutput,
};

const PLOT_WIDTH: usize = 80;
const PLOT_HEIGHT: usize = 20;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("{}", serde_json::to_string_pretty(&args)?);

    let mut rng = match args.seed {
        Some(seed) => {
            info!("using seed: {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let mut dataset = mnist::load(&args.dataset_dir()).context("failed to load MNIST")?;
    if let Some(max) = args.max_dataset_size.filter(|&max| dataset.len() > max) {
        info!("limiting dataset size to: {max}");
        dataset.truncate(max);
    }

    let model = Sequential::mlp(&args.layer_sizes, args.activation.act_fn())?;
    ensure!(
        args.layer_sizes.first() == Some(&dataset.x_size())
            && args.layer_sizes.last() == Some(&dataset.y_size()),
        "layer sizes {:?} don't fit {} features and {} classes",
        args.layer_sizes,
        dataset.x_size(),
        dataset.y_size()
    );
    info!("{model}");

    let params = model.init_params(&mut rng)?;

    let (metrics, result) = match args.loss {
        Loss::CrossEntropy => train(&args, model, params, CrossEntropy::new(), dataset, rng),
        Loss::Mse => train(&args, model, params, Mse::new(), dataset, rng),
    };

    let error = result.as_ref().err().map(ToString::to_string);
    if let Some(path) = &args.output_path {
        TrainingOutput::new(&args, &metrics, error).write(path)?;
        info!("wrote output to: {}", path.display());
    }

    result.context("training aborted")?;

    if args.plot {
        let losses: Vec<f32> = metrics.all().iter().map(|r| r.train_loss()).collect();
        println!("{} train_loss", args.run_name);
        print!("{}", plot::render(&losses, PLOT_WIDTH, PLOT_HEIGHT));
    }

    Ok(())
}

/// Runs the whole SVRG schedule, handing back whatever metrics were recorded even when the
/// run fails.
fn train<L: LossFn>(
    args: &Args,
    model: Sequential,
    params: Vec<f32>,
    loss_fn: L,
    dataset: Dataset,
    rng: StdRng,
) -> (MetricsRecorder, machine_learning::Result<()>) {
    let trainer = SvrgTrainer::new(
        model,
        params,
        loss_fn,
        dataset,
        args.to_config(),
        rng,
        SystemClock::new(),
    );

    let mut trainer = match trainer {
        Ok(trainer) => trainer,
        Err(e) => return (MetricsRecorder::new(), Err(e)),
    };

    let result = trainer.train();
    (trainer.into_metrics(), result)
}
