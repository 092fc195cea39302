use std::{env, num::NonZeroUsize, path::PathBuf};

use clap::{Parser, ValueEnum};
use machine_learning::{
    arch::activations::ActFn,
    training::{IterateSelection, SubEpochOrder, SvrgConfig},
};
use serde::Serialize;

/// Trains a feed-forward classifier on MNIST with stochastic variance reduced gradient descent.
#[derive(Debug, Parser, Serialize)]
#[command(name = "svrg", version)]
pub struct Args {
    /// Seed for every random choice of the run, taken from the OS when unset
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory holding the MNIST IDX files, directly or under `MNIST/raw`
    #[arg(long, default_value = "~/datasets/pytorch")]
    pub dataset_path: String,

    /// Keep only the first N training examples
    #[arg(long)]
    pub max_dataset_size: Option<usize>,

    #[arg(long, default_value_t = NonZeroUsize::MIN)]
    pub batch_size: NonZeroUsize,

    /// Learning rate of the plain SGD warmup
    #[arg(long, default_value_t = 0.01)]
    pub warmup_learning_rate: f32,

    /// Learning rate of the variance reduced inner steps
    #[arg(long, default_value_t = 0.025)]
    pub learning_rate: f32,

    #[arg(long, default_value_t = 0.0001)]
    pub weight_decay: f32,

    /// Width of every layer, input first and classes last
    #[arg(long, num_args = 2.., default_values_t = [784, 100, 10])]
    pub layer_sizes: Vec<usize>,

    /// Activation between hidden layers
    #[arg(long, value_enum, default_value_t = Activation::Relu)]
    pub activation: Activation,

    #[arg(long, value_enum, default_value_t = Loss::CrossEntropy)]
    pub loss: Loss,

    #[arg(long, value_enum, default_value_t = Device::Cpu)]
    pub device: Device,

    #[arg(long, default_value_t = 10)]
    pub num_warmup_epochs: usize,

    #[arg(long, default_value_t = 100)]
    pub num_outer_epochs: usize,

    /// Inner sub-epochs per outer epoch
    #[arg(long, default_value_t = 5)]
    pub num_inner_epochs: usize,

    /// Fraction of the batches each inner sub-epoch goes through
    #[arg(long)]
    pub inner_epoch_fraction: Option<f32>,

    /// Pick the next snapshot uniformly among the inner iterates instead of the last one
    #[arg(long)]
    pub choose_random_iterate: bool,

    /// Shuffle once per outer epoch and let every inner sub-epoch reuse the same batches
    #[arg(long)]
    pub fixed_inner_prefix: bool,

    #[arg(long, default_value = "svrg")]
    pub run_name: String,

    /// Where to write the JSON run record
    #[arg(long)]
    pub output_path: Option<PathBuf>,

    /// Draw the training loss on the terminal when done
    #[arg(long)]
    pub plot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    pub fn act_fn(self) -> ActFn {
        match self {
            Activation::Relu => ActFn::relu(),
            Activation::Sigmoid => ActFn::sigmoid(1.),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Loss {
    CrossEntropy,
    Mse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Device {
    Cpu,
}

impl Args {
    /// The training hyperparameters described by the flags.
    pub fn to_config(&self) -> SvrgConfig {
        SvrgConfig {
            num_warmup_epochs: self.num_warmup_epochs,
            num_outer_epochs: self.num_outer_epochs,
            num_inner_epochs: self.num_inner_epochs,
            inner_epoch_fraction: self.inner_epoch_fraction,
            warmup_learning_rate: self.warmup_learning_rate,
            learning_rate: self.learning_rate,
            weight_decay: self.weight_decay,
            batch_size: self.batch_size,
            iterate_selection: if self.choose_random_iterate {
                IterateSelection::Random
            } else {
                IterateSelection::Last
            },
            sub_epoch_order: if self.fixed_inner_prefix {
                SubEpochOrder::FixedPrefix
            } else {
                SubEpochOrder::Reshuffle
            },
        }
    }

    /// The dataset directory with a leading `~` expanded to the home directory.
    pub fn dataset_dir(&self) -> PathBuf {
        expand_home(&self.dataset_path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    let home = env::var_os("HOME").map(PathBuf::from);

    match (path.strip_prefix("~"), home) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches('/')),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_run() {
        let args = Args::parse_from(["svrg"]);
        let config = args.to_config();

        assert_eq!(args.layer_sizes, [784, 100, 10]);
        assert_eq!(args.loss, Loss::CrossEntropy);
        assert_eq!(config.batch_size.get(), 1);
        assert_eq!(config.num_warmup_epochs, 10);
        assert_eq!(config.num_outer_epochs, 100);
        assert_eq!(config.num_inner_epochs, 5);
        assert_eq!(config.learning_rate, 0.025);
        assert_eq!(config.iterate_selection, IterateSelection::Last);
        assert_eq!(config.sub_epoch_order, SubEpochOrder::Reshuffle);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn flags_reach_the_config() {
        let args = Args::parse_from([
            "svrg",
            "--batch-size",
            "32",
            "--layer-sizes",
            "784",
            "10",
            "--inner-epoch-fraction",
            "0.5",
            "--choose-random-iterate",
            "--fixed-inner-prefix",
            "--loss",
            "mse",
        ]);
        let config = args.to_config();

        assert_eq!(args.layer_sizes, [784, 10]);
        assert_eq!(args.loss, Loss::Mse);
        assert_eq!(config.batch_size.get(), 32);
        assert_eq!(config.inner_epoch_fraction, Some(0.5));
        assert_eq!(config.iterate_selection, IterateSelection::Random);
        assert_eq!(config.sub_epoch_order, SubEpochOrder::FixedPrefix);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(Args::try_parse_from(["svrg", "--batch-size", "0"]).is_err());
    }

    #[test]
    fn only_a_leading_tilde_is_expanded() {
        assert_eq!(expand_home("/data/mnist"), PathBuf::from("/data/mnist"));

        if let Some(home) = env::var_os("HOME") {
            assert_eq!(expand_home("~/x"), PathBuf::from(home).join("x"));
        }
    }
}
