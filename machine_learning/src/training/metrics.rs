use serde::{Deserialize, Serialize};

/// One per-epoch training record.
///
/// Serialized without a tag, so a warmup record reads
/// `{"warmup_epoch": 1, "train_loss": .., "grad_norm": .., "examples_per_sec": ..}` and an
/// inner one carries `outer_epoch` and `inner_epoch` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricRecord {
    Inner {
        outer_epoch: usize,
        inner_epoch: usize,
        train_loss: f32,
        grad_norm: f32,
        examples_per_sec: f64,
    },
    Warmup {
        warmup_epoch: usize,
        train_loss: f32,
        grad_norm: f32,
        examples_per_sec: f64,
    },
}

impl MetricRecord {
    /// The mean training loss of the epoch.
    pub fn train_loss(&self) -> f32 {
        match self {
            Self::Inner { train_loss, .. } | Self::Warmup { train_loss, .. } => *train_loss,
        }
    }

    /// The norm of the exact full gradient at the end of the epoch.
    pub fn grad_norm(&self) -> f32 {
        match self {
            Self::Inner { grad_norm, .. } | Self::Warmup { grad_norm, .. } => *grad_norm,
        }
    }

    pub fn examples_per_sec(&self) -> f64 {
        match self {
            Self::Inner {
                examples_per_sec, ..
            }
            | Self::Warmup {
                examples_per_sec, ..
            } => *examples_per_sec,
        }
    }

    pub fn is_warmup(&self) -> bool {
        matches!(self, Self::Warmup { .. })
    }
}

/// Append-only, chronologically ordered log of `MetricRecord`s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsRecorder {
    records: Vec<MetricRecord>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: MetricRecord) {
        self.records.push(record);
    }

    /// Every record, oldest first.
    pub fn all(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<MetricRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_keep_their_insertion_order() {
        let mut recorder = MetricsRecorder::new();

        recorder.append(MetricRecord::Warmup {
            warmup_epoch: 1,
            train_loss: 2.0,
            grad_norm: 1.0,
            examples_per_sec: 0.0,
        });
        recorder.append(MetricRecord::Inner {
            outer_epoch: 1,
            inner_epoch: 1,
            train_loss: 1.5,
            grad_norm: 0.5,
            examples_per_sec: 0.0,
        });
        recorder.append(MetricRecord::Inner {
            outer_epoch: 1,
            inner_epoch: 1,
            train_loss: 1.5,
            grad_norm: 0.5,
            examples_per_sec: 0.0,
        });

        let losses: Vec<_> = recorder.all().iter().map(MetricRecord::train_loss).collect();
        assert_eq!(losses, [2.0, 1.5, 1.5]);
        assert!(recorder.all()[0].is_warmup());
    }

    #[test]
    fn records_serialize_without_a_tag() {
        let record = MetricRecord::Inner {
            outer_epoch: 2,
            inner_epoch: 3,
            train_loss: 0.5,
            grad_norm: 0.25,
            examples_per_sec: 10.0,
        };

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["outer_epoch"], 2);
        assert_eq!(json["inner_epoch"], 3);
        assert_eq!(json["train_loss"], 0.5);
        assert!(json.get("warmup_epoch").is_none());

        let back: MetricRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
