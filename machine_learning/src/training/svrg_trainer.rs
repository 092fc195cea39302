use log::{debug, info};
use rand::Rng;

use super::{
    Clock, ControlVariate, FullGradientEstimator, IterateArena, IterateSelection,
    MetricsRecorder, SvrgConfig,
};
use crate::{
    MlErr, Result,
    arch::{Model, Replica, loss::LossFn},
    dataset::Dataset,
};

/// Trains a model with stochastic variance reduced gradient descent.
///
/// Two replicas of the model live for the whole run. The *target* (snapshot) is warmed up with
/// plain SGD and then, once per outer epoch, provides the full gradient `mu` and the per-batch
/// snapshot gradients. The *working* replica starts every outer epoch at the target and takes
/// the corrected steps. Every working state visited during an outer epoch is kept in an
/// `IterateArena`, and one of them becomes the next target.
pub struct SvrgTrainer<M, L, R, C>
where
    M: Model,
    L: LossFn,
    R: Rng,
    C: Clock,
{
    pub(super) working: Replica<M>,
    pub(super) target: Replica<M>,
    pub(super) loss_fn: L,
    pub(super) dataset: Dataset,
    pub(super) config: SvrgConfig,
    pub(super) estimator: FullGradientEstimator,
    pub(super) arena: IterateArena,
    pub(super) metrics: MetricsRecorder,

    // Scratch buffers, one parameter vector each.
    pub(super) grad: Vec<f32>,
    pub(super) snapshot_grad: Vec<f32>,
    pub(super) control: ControlVariate,

    pub(super) rng: R,
    pub(super) clock: C,
}

impl<M, L, R, C> SvrgTrainer<M, L, R, C>
where
    M: Model + Clone,
    L: LossFn,
    R: Rng,
    C: Clock,
{
    /// Returns a new `SvrgTrainer`.
    ///
    /// # Arguments
    /// * `model` - The architecture being trained.
    /// * `params` - The initial parameters, shared by both replicas.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `dataset` - The dataset the model will be trained with.
    /// * `config` - The run's hyperparameters.
    /// * `rng` - The only source of randomness: shuffling and random iterate selection.
    /// * `clock` - Time source for the throughput diagnostics.
    ///
    /// # Errors
    /// A configuration error if `config` is invalid or the dataset is empty, a resource error
    /// if the iterate arena cannot be reserved.
    pub fn new(
        model: M,
        params: Vec<f32>,
        loss_fn: L,
        dataset: Dataset,
        config: SvrgConfig,
        rng: R,
        clock: C,
    ) -> Result<Self> {
        config.validate()?;

        if dataset.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        let target = Replica::new(model.clone(), params.clone())?;
        let working = Replica::new(model, params)?;
        let size = target.size();

        let per_sub_epoch = config.batches_per_sub_epoch(dataset.num_batches(config.batch_size))?;
        let capacity = if config.num_outer_epochs > 0 {
            config
                .num_inner_epochs
                .checked_mul(per_sub_epoch)
                .ok_or(MlErr::InvalidConfig(
                    "inner epochs times batches per sub-epoch overflows the iterate arena",
                ))?
        } else {
            0
        };

        let arena = IterateArena::with_capacity(size, capacity)?;
        debug!(states = capacity, bytes = arena.bytes(); "reserved iterate arena");

        Ok(Self {
            working,
            target,
            loss_fn,
            estimator: FullGradientEstimator::new(config.batch_size),
            dataset,
            config,
            arena,
            metrics: MetricsRecorder::new(),
            grad: vec![0.; size],
            snapshot_grad: vec![0.; size],
            control: ControlVariate::new(size),
            rng,
            clock,
        })
    }
}

impl<M, L, R, C> SvrgTrainer<M, L, R, C>
where
    M: Model,
    L: LossFn,
    R: Rng,
    C: Clock,
{
    /// Runs the warmup epochs followed by every outer epoch.
    ///
    /// Any failure aborts the run right away. The records appended up to that point stay
    /// available through `metrics`.
    pub fn train(&mut self) -> Result<()> {
        info!(
            "training on {} examples, {} parameters",
            self.dataset.len(),
            self.target.size()
        );

        self.warmup()?;

        for epoch in 1..=self.config.num_outer_epochs {
            self.outer_epoch(epoch)?;
        }

        Ok(())
    }

    /// Runs a single outer epoch: snapshot gradient, working reset, inner loop and snapshot
    /// selection.
    ///
    /// # Arguments
    /// * `epoch` - The 1-based outer epoch index, only used for the records.
    pub fn outer_epoch(&mut self, epoch: usize) -> Result<()> {
        let mu = self
            .estimator
            .compute(&mut self.target, &self.dataset, &self.loss_fn)?;
        debug!(outer_epoch = epoch, mu_norm = mu.norm; "computed snapshot gradient");

        self.reset_working()?;
        self.arena.clear();

        self.inner_loop(epoch, &mu.grad)?;

        let index = self.select_next_snapshot()?;
        debug!(outer_epoch = epoch, step = index, candidates = self.arena.len(); "selected next snapshot");

        Ok(())
    }

    /// Copies the target's parameters into the working replica.
    pub fn reset_working(&mut self) -> Result<()> {
        self.working.load_state(self.target.params())
    }

    /// Loads one of the iterates of the last inner loop into the target, following the
    /// configured `IterateSelection`.
    ///
    /// # Returns
    /// The step index of the chosen iterate.
    pub fn select_next_snapshot(&mut self) -> Result<usize> {
        let candidates = self.arena.len();

        let index = match self.config.iterate_selection {
            IterateSelection::Last => candidates.checked_sub(1),
            IterateSelection::Random => {
                (candidates > 0).then(|| self.rng.random_range(0..candidates))
            }
        }
        .ok_or(MlErr::NoIterates)?;

        let state = self.arena.get(index).ok_or(MlErr::NoIterates)?;
        self.target.load_state(state)?;

        Ok(index)
    }

    pub fn working(&self) -> &Replica<M> {
        &self.working
    }

    pub fn target(&self) -> &Replica<M> {
        &self.target
    }

    /// The iterates produced by the last inner loop.
    pub fn arena(&self) -> &IterateArena {
        &self.arena
    }

    pub fn config(&self) -> &SvrgConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Every record appended so far, also after a failed run.
    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn into_metrics(self) -> MetricsRecorder {
        self.metrics
    }
}
