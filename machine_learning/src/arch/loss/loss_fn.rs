use ndarray::{Array2, ArrayView2};

/// A scalar loss over a batch of predictions.
///
/// `loss` is the mean over the batch and `loss_prime` is the derivative of that same mean
/// with respect to every prediction entry, so the gradient a model gets from it is already
/// averaged over the batch.
pub trait LossFn {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}
