use super::Optimizer;
use crate::{MlErr, Result};

/// Gradient descent with L2 weight decay.
#[derive(Debug, Clone, Copy)]
pub struct GradientDescent {
    learning_rate: f32,
    weight_decay: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `weight_decay` - The L2 penalty coefficient added to the gradient, `0` disables it.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(learning_rate: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            weight_decay,
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl Optimizer for GradientDescent {
    /// Makes a step in the opposite direction of the regularized gradient,
    /// `param -= lr * (grad + weight_decay * param)`.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(MlErr::SizeMismatch {
                what: "optimizer gradient",
                got: grad.len(),
                expected: params.len(),
            });
        }

        let Self {
            learning_rate: lr,
            weight_decay: wd,
        } = *self;

        for (p, g) in params.iter_mut().zip(grad) {
            *p -= lr * (g + wd * *p);
        }

        Ok(())
    }
}
