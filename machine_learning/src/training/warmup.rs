use log::info;
use rand::Rng;

use super::{Clock, MetricRecord, SvrgTrainer, clock::throughput, ensure_finite};
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
    /// Runs the configured amount of plain SGD epochs on the target, so that variance
    /// reduction starts from a reasonable point. Appends one record per epoch.
    pub fn warmup(&mut self) -> Result<()> {
        let mut optimizer =
            GradientDescent::new(self.config.warmup_learning_rate, self.config.weight_decay);

        for epoch in 1..=self.config.num_warmup_epochs {
            self.warmup_epoch(epoch, &mut optimizer)?;
        }

        Ok(())
    }

    fn warmup_epoch<O: Optimizer>(&mut self, epoch: usize, optimizer: &mut O) -> Result<()> {
        let start = self.clock.elapsed();
        self.dataset.shuffle(&mut self.rng);

        let mut total_loss = 0.;
        let mut examples = 0;

        for (x, y) in self.dataset.batches(self.config.batch_size) {
            let n = x.nrows();
            let loss = self.target.gradient(&self.loss_fn, x, y, &mut self.grad)?;
            ensure_finite("warmup loss", loss)?;

            optimizer.update_params(&self.grad, self.target.params_mut())?;

            total_loss += loss as f64 * n as f64;
            examples += n;
        }

        let train_loss = (total_loss / examples as f64) as f32;
        let grad_norm = self
            .estimator
            .norm(&mut self.target, &self.dataset, &self.loss_fn)?;
        let examples_per_sec = throughput(examples, self.clock.elapsed().saturating_sub(start));

        info!(
            "[Warmup {}/{}] loss: {:.04}, grad_norm: {:.02}, (1k) ex/s: {:.02}",
            epoch,
            self.config.num_warmup_epochs,
            train_loss,
            grad_norm,
            examples_per_sec / 1000.
        );

        self.metrics.append(MetricRecord::Warmup {
            warmup_epoch: epoch,
            train_loss,
            grad_norm,
            examples_per_sec,
        });

        Ok(())
    }
}
