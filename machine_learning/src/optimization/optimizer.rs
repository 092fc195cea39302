use crate::Result;

/// A first-order update rule.
pub trait Optimizer {
    /// Takes one step on `params` using `grad`.
    ///
    /// # Errors
    /// Returns `MlErr::SizeMismatch` if both buffers differ in length.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;
}
