use log::info;
use rand::Rng;

use super::{Clock, MetricRecord, SubEpochOrder, SvrgTrainer, clock::throughput, ensure_finite};
use crate::{
    Result,
    arch::{Model, loss::LossFn},
    optimization::{GradientDescent, Optimizer},
};

impl<M, L, R, C> SvrgTrainer<M, L, R, C>
where
    M: Model,
    L: LossFn,
    R: Rng,
    C: Clock,
{
    /// Runs every inner sub-epoch of an outer epoch on the working replica, storing each
    /// visited state in the arena and appending one record per sub-epoch.
    ///
    /// # Arguments
    /// * `outer_epoch` - The outer epoch index, only used for the records.
    /// * `mu` - The full gradient at the target, fixed for the whole inner loop.
    pub(super) fn inner_loop(&mut self, outer_epoch: usize, mu: &[f32]) -> Result<()> {
        let batch_size = self.config.batch_size;
        let per_sub_epoch = self
            .config
            .batches_per_sub_epoch(self.dataset.num_batches(batch_size))?;
        let mut optimizer =
            GradientDescent::new(self.config.learning_rate, self.config.weight_decay);

        if self.config.sub_epoch_order == SubEpochOrder::FixedPrefix {
            self.dataset.shuffle(&mut self.rng);
        }

        for sub_epoch in 1..=self.config.num_inner_epochs {
            let start = self.clock.elapsed();

            if self.config.sub_epoch_order == SubEpochOrder::Reshuffle {
                self.dataset.shuffle(&mut self.rng);
            }

            let mut total_loss = 0.;
            let mut examples = 0;

            for (x, y) in self.dataset.batches(batch_size).take(per_sub_epoch) {
                let n = x.nrows();

                self.target
                    .gradient(&self.loss_fn, x, y, &mut self.snapshot_grad)?;
                self.control.set(&self.snapshot_grad, mu)?;

                let working_loss = self.working.gradient(&self.loss_fn, x, y, &mut self.grad)?;
                let aux_loss = self
                    .control
                    .auxiliary_loss(working_loss, self.working.params());
                ensure_finite("working loss", working_loss)?;
                ensure_finite("auxiliary loss", aux_loss)?;

                self.control.apply(&mut self.grad);
                optimizer.update_params(&self.grad, self.working.params_mut())?;

                total_loss += working_loss as f64 * n as f64;
                examples += n;

                self.arena.push(self.working.params())?;
            }

            let train_loss = (total_loss / examples as f64) as f32;
            let grad_norm = self
                .estimator
                .norm(&mut self.working, &self.dataset, &self.loss_fn)?;
            let examples_per_sec =
                throughput(examples, self.clock.elapsed().saturating_sub(start));

            info!(
                "[Outer {}/{}, Inner {}/{}] loss: {:.04}, grad_norm: {:.02}, (1k) ex/s: {:.02}",
                outer_epoch,
                self.config.num_outer_epochs,
                sub_epoch,
                self.config.num_inner_epochs,
                train_loss,
                grad_norm,
                examples_per_sec / 1000.
            );

            self.metrics.append(MetricRecord::Inner {
                outer_epoch,
                inner_epoch: sub_epoch,
                train_loss,
                grad_norm,
                examples_per_sec,
            });
        }

        Ok(())
    }
}
