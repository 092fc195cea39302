use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// How the snapshot for the next outer epoch is picked among the inner iterates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterateSelection {
    /// The parameters after the very last inner step.
    #[default]
    Last,
    /// A uniformly random iterate among every inner step of the outer epoch.
    Random,
}

/// How the batches of consecutive inner sub-epochs relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubEpochOrder {
    /// Every sub-epoch reshuffles the dataset before taking its batches.
    #[default]
    Reshuffle,
    /// The dataset is shuffled once per outer epoch and every sub-epoch consumes the same
    /// leading batches.
    FixedPrefix,
}

/// The hyperparameters of an SVRG run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvrgConfig {
    pub num_warmup_epochs: usize,
    pub num_outer_epochs: usize,
    pub num_inner_epochs: usize,
    /// Fraction of the dataset's batches each inner sub-epoch goes through, all of them
    /// when unset.
    pub inner_epoch_fraction: Option<f32>,
    pub warmup_learning_rate: f32,
    pub learning_rate: f32,
    pub weight_decay: f32,
    pub batch_size: NonZeroUsize,
    pub iterate_selection: IterateSelection,
    pub sub_epoch_order: SubEpochOrder,
}

impl Default for SvrgConfig {
    fn default() -> Self {
        Self {
            num_warmup_epochs: 10,
            num_outer_epochs: 100,
            num_inner_epochs: 5,
            inner_epoch_fraction: None,
            warmup_learning_rate: 0.01,
            learning_rate: 0.025,
            weight_decay: 0.0001,
            batch_size: NonZeroUsize::MIN,
            iterate_selection: IterateSelection::Last,
            sub_epoch_order: SubEpochOrder::Reshuffle,
        }
    }
}

impl SvrgConfig {
    /// Checks that the hyperparameters describe a meaningful run.
    ///
    /// # Errors
    /// `MlErr::InvalidConfig` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            (self.warmup_learning_rate, "warmup learning rate must be finite and non-negative"),
            (self.learning_rate, "learning rate must be finite and non-negative"),
            (self.weight_decay, "weight decay must be finite and non-negative"),
        ];

        for (value, msg) in rates {
            if !value.is_finite() || value < 0. {
                return Err(MlErr::InvalidConfig(msg));
            }
        }

        if self
            .inner_epoch_fraction
            .is_some_and(|fraction| !fraction.is_finite() || fraction <= 0.)
        {
            return Err(MlErr::InvalidConfig(
                "inner epoch fraction must be a positive number",
            ));
        }

        if self.num_outer_epochs > 0 && self.num_inner_epochs == 0 {
            return Err(MlErr::InvalidConfig(
                "outer epochs need at least one inner epoch to pick a snapshot from",
            ));
        }

        Ok(())
    }

    /// Returns how many batches one inner sub-epoch processes.
    ///
    /// # Arguments
    /// * `num_batches` - The amount of batches in a full pass over the dataset.
    ///
    /// # Errors
    /// `MlErr::InvalidConfig` if the fraction truncates the sub-epoch to no batches at all.
    pub fn batches_per_sub_epoch(&self, num_batches: usize) -> Result<usize> {
        let Some(fraction) = self.inner_epoch_fraction else {
            return Ok(num_batches);
        };

        let batches = ((num_batches as f64 * fraction as f64).floor() as usize).min(num_batches);

        if batches == 0 {
            return Err(MlErr::InvalidConfig(
                "inner epoch fraction leaves no batches in a sub-epoch",
            ));
        }

        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SvrgConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let bad = [
            SvrgConfig {
                learning_rate: f32::NAN,
                ..Default::default()
            },
            SvrgConfig {
                weight_decay: -1.0,
                ..Default::default()
            },
            SvrgConfig {
                inner_epoch_fraction: Some(0.0),
                ..Default::default()
            },
            SvrgConfig {
                num_inner_epochs: 0,
                ..Default::default()
            },
        ];

        for config in bad {
            assert!(
                matches!(config.validate(), Err(MlErr::InvalidConfig(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn zero_inner_epochs_is_fine_without_outer_epochs() {
        let config = SvrgConfig {
            num_outer_epochs: 0,
            num_inner_epochs: 0,
            ..Default::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn fraction_truncates_and_clamps_the_sub_epoch() {
        let mut config = SvrgConfig::default();
        assert_eq!(config.batches_per_sub_epoch(10).unwrap(), 10);

        config.inner_epoch_fraction = Some(0.25);
        assert_eq!(config.batches_per_sub_epoch(10).unwrap(), 2);

        config.inner_epoch_fraction = Some(3.0);
        assert_eq!(config.batches_per_sub_epoch(10).unwrap(), 10);

        config.inner_epoch_fraction = Some(0.05);
        assert!(config.batches_per_sub_epoch(10).is_err());
    }
}
