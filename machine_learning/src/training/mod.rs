mod arena;
mod clock;
mod config;
mod control_variate;
mod full_gradient;
mod inner;
mod metrics;
mod svrg_trainer;
mod warmup;

pub use arena::IterateArena;
pub use clock::{Clock, SystemClock};
pub use config::{IterateSelection, SubEpochOrder, SvrgConfig};
pub use control_variate::ControlVariate;
pub use full_gradient::{FullGradient, FullGradientEstimator, l2_norm};
pub use metrics::{MetricRecord, MetricsRecorder};
pub use svrg_trainer::SvrgTrainer;

use crate::{MlErr, Result};

/// Fails with `MlErr::NonFinite` unless `value` is a finite number.
pub(crate) fn ensure_finite(what: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(MlErr::NonFinite { what })
    }
}
