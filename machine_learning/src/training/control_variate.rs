use crate::{MlErr, Result};

/// The SVRG correction `g_snapshot - mu` for one batch.
///
/// The correction is held as plain numbers, detached from any gradient computation. Adding
/// `-<correction, w>` to the working loss builds the auxiliary loss whose gradient with
/// respect to `w` is `∇L_working - (g_snapshot - mu)`: the stochastic gradient recentered on
/// the full gradient.
#[derive(Debug, Clone)]
pub struct ControlVariate {
    correction: Vec<f32>,
}

impl ControlVariate {
    pub fn new(size: usize) -> Self {
        Self {
            correction: vec![0.; size],
        }
    }

    /// Stores `g_snapshot - mu` as the current correction.
    pub fn set(&mut self, g_snapshot: &[f32], mu: &[f32]) -> Result<()> {
        let expected = self.correction.len();

        for (what, got) in [("snapshot gradient", g_snapshot.len()), ("mu", mu.len())] {
            if got != expected {
                return Err(MlErr::SizeMismatch {
                    what,
                    got,
                    expected,
                });
            }
        }

        for ((c, g), m) in self.correction.iter_mut().zip(g_snapshot).zip(mu) {
            *c = g - m;
        }

        Ok(())
    }

    pub fn correction(&self) -> &[f32] {
        &self.correction
    }

    /// Value of the auxiliary loss, `L_working - <correction, w>`.
    pub fn auxiliary_loss(&self, working_loss: f32, params: &[f32]) -> f32 {
        let dot: f32 = self
            .correction
            .iter()
            .zip(params)
            .map(|(c, w)| c * w)
            .sum();

        working_loss - dot
    }

    /// Turns the working gradient into the auxiliary loss gradient, in place.
    pub fn apply(&self, working_grad: &mut [f32]) {
        for (g, c) in working_grad.iter_mut().zip(&self.correction) {
            *g -= c;
        }
    }
}
