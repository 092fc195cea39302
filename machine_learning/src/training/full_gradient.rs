use std::num::NonZeroUsize;

use super::ensure_finite;
use crate::{
    MlErr, Result,
    arch::{Model, Replica, loss::LossFn},
    dataset::Dataset,
};

/// The exact gradient of the mean loss over a whole dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FullGradient {
    pub grad: Vec<f32>,
    pub norm: f32,
}

/// Computes exact full-dataset gradients by averaging batch gradients weighted by batch size.
#[derive(Debug, Clone, Copy)]
pub struct FullGradientEstimator {
    batch_size: NonZeroUsize,
}

impl FullGradientEstimator {
    /// Creates a new `FullGradientEstimator`.
    ///
    /// # Arguments
    /// * `batch_size` - How many rows are pushed through the model at once. Only affects the
    ///   floating point reduction order, never the result's meaning.
    pub fn new(batch_size: NonZeroUsize) -> Self {
        Self { batch_size }
    }

    /// Computes the gradient of the mean loss over every example in `dataset` at the
    /// replica's current parameters.
    ///
    /// Every example is visited exactly once, in the dataset's current order. The replica's
    /// parameters are left untouched and no gradient state survives the call.
    ///
    /// # Errors
    /// `MlErr::EmptyDataset` for a dataset without rows, `MlErr::NonFinite` if the resulting
    /// gradient is not finite, or whatever the model reports.
    pub fn compute<M, L>(
        &self,
        replica: &mut Replica<M>,
        dataset: &Dataset,
        loss_fn: &L,
    ) -> Result<FullGradient>
    where
        M: Model,
        L: LossFn,
    {
        if dataset.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        let size = replica.size();
        let mut sum = vec![0.; size];
        let mut batch_grad = vec![0.; size];
        let mut examples = 0;

        for (x, y) in dataset.batches(self.batch_size) {
            let n = x.nrows();
            replica.gradient(loss_fn, x, y, &mut batch_grad)?;

            for (s, g) in sum.iter_mut().zip(&batch_grad) {
                *s += g * n as f32;
            }

            examples += n;
        }

        let examples = examples as f32;
        sum.iter_mut().for_each(|s| *s /= examples);

        let norm = l2_norm(&sum);
        ensure_finite("full gradient", norm)?;

        Ok(FullGradient { grad: sum, norm })
    }

    /// Computes only the norm of the full gradient, for diagnostics.
    pub fn norm<M, L>(&self, replica: &mut Replica<M>, dataset: &Dataset, loss_fn: &L) -> Result<f32>
    where
        M: Model,
        L: LossFn,
    {
        self.compute(replica, dataset, loss_fn).map(|full| full.norm)
    }
}

/// Euclidean norm of a flat vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
