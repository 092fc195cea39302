use ndarray::{Array2, ArrayView2};

use super::{Model, loss::LossFn};
use crate::{MlErr, Result};

/// A live instance of a model: an architecture together with its own parameter buffer.
///
/// Several replicas of the same architecture share the parameter layout, so their states can
/// be copied into one another wholesale.
#[derive(Clone, Debug)]
pub struct Replica<M: Model> {
    model: M,
    params: Vec<f32>,
}

impl<M: Model> Replica<M> {
    /// Creates a new `Replica`.
    ///
    /// # Arguments
    /// * `model` - The architecture.
    /// * `params` - The initial parameters, exactly `model.size()` of them.
    pub fn new(model: M, params: Vec<f32>) -> Result<Self> {
        if params.len() != model.size() {
            return Err(MlErr::SizeMismatch {
                what: "replica parameters",
                got: params.len(),
                expected: model.size(),
            });
        }

        Ok(Self { model, params })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// The flat parameter vector, in the architecture's layout order.
    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    pub fn size(&self) -> usize {
        self.params.len()
    }

    /// Replaces every parameter with the values in `state`.
    pub fn load_state(&mut self, state: &[f32]) -> Result<()> {
        if state.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "loaded state",
                got: state.len(),
                expected: self.params.len(),
            });
        }

        self.params.copy_from_slice(state);
        Ok(())
    }

    pub fn predict(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.model.forward(&self.params, x)
    }

    /// Computes the batch loss without touching any gradient.
    pub fn loss<L: LossFn>(
        &mut self,
        loss_fn: &L,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
    ) -> Result<f32> {
        let y_pred = self.predict(x)?;
        Self::check_targets(&y_pred, y)?;

        Ok(loss_fn.loss(y_pred.view(), y))
    }

    /// Computes the batch loss and writes its gradient with respect to every parameter into
    /// `grad`. Whatever `grad` held before is discarded.
    ///
    /// # Returns
    /// The batch loss.
    pub fn gradient<L: LossFn>(
        &mut self,
        loss_fn: &L,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
        grad: &mut [f32],
    ) -> Result<f32> {
        if grad.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "gradient buffer",
                got: grad.len(),
                expected: self.params.len(),
            });
        }

        grad.fill(0.);

        let y_pred = self.predict(x)?;
        Self::check_targets(&y_pred, y)?;

        let loss = loss_fn.loss(y_pred.view(), y);
        let d = loss_fn.loss_prime(y_pred.view(), y);
        self.model.backward(&self.params, grad, d)?;

        Ok(loss)
    }

    fn check_targets(y_pred: &Array2<f32>, y: ArrayView2<f32>) -> Result<()> {
        if y_pred.dim() != y.dim() {
            return Err(MlErr::SizeMismatch {
                what: "target columns",
                got: y.ncols(),
                expected: y_pred.ncols(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::arch::{Sequential, activations::ActFn, loss::Mse};

    fn linear() -> Replica<Sequential> {
        let model = Sequential::mlp(&[2, 1], ActFn::relu()).unwrap();
        // w = [1, -1], b = 0.5
        Replica::new(model, vec![1.0, -1.0, 0.5]).unwrap()
    }

    #[test]
    fn new_rejects_a_wrong_sized_buffer() {
        let model = Sequential::mlp(&[2, 1], ActFn::relu()).unwrap();
        assert!(Replica::new(model, vec![0.0; 4]).is_err());
    }

    #[test]
    fn load_state_replaces_every_parameter() {
        let mut replica = linear();

        replica.load_state(&[3.0, 2.0, 1.0]).unwrap();
        assert_eq!(replica.params(), [3.0, 2.0, 1.0]);

        assert!(replica.load_state(&[1.0]).is_err());
        assert_eq!(replica.params(), [3.0, 2.0, 1.0]);
    }

    #[test]
    fn gradient_overwrites_stale_values() {
        let mut replica = linear();
        let x = array![[1.0, 2.0]];
        let y = array![[0.0]];
        let mut grad = vec![100.0; 3];

        // y_pred = 1 - 2 + 0.5 = -0.5, loss = 0.25, dL/dy = -1
        let loss = replica.gradient(&Mse, x.view(), y.view(), &mut grad).unwrap();

        assert_eq!(loss, 0.25);
        assert_eq!(grad, [-1.0, -2.0, -1.0]);
    }

    #[test]
    fn mismatched_targets_are_rejected() {
        let mut replica = linear();
        let x = array![[1.0, 2.0]];
        let y = array![[0.0, 1.0]];

        assert!(replica.loss(&Mse, x.view(), y.view()).is_err());
    }
}
