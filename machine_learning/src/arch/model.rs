use std::ops::Range;

use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A named region of a model's flat parameter buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    pub name: String,
    pub range: Range<usize>,
}

/// A differentiable function over a flat parameter buffer.
///
/// The model does not own its parameters, every call receives them. The order in which the
/// parameters are laid out in the buffer is fixed by the architecture, so two buffers for the
/// same architecture can be compared, dotted and copied element-wise.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Returns the named regions of the parameter buffer, in buffer order.
    fn layout(&self) -> Vec<ParamSlot>;

    /// Computes the model's prediction for a batch of rows.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input batch, one example per row.
    ///
    /// # Returns
    /// The prediction or an error if the shapes don't match the architecture.
    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Propagates the derivative of the loss with respect to the last prediction back through
    /// the model. Must be called after `forward` with the same parameters.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer of `size()` elements, overwritten with the parameter gradient.
    /// * `d` - The derivative of the loss with respect to the prediction.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()>;
}
