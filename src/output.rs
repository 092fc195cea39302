use std::{env, fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use machine_learning::training::MetricsRecorder;
use serde::Serialize;

use crate::args::Args;

/// The JSON record of a run: how it was invoked and every metric it produced.
#[derive(Debug, Serialize)]
pub struct TrainingOutput<'a> {
    pub script: &'static str,
    pub argv: Vec<String>,
    pub args: &'a Args,
    pub metrics: &'a MetricsRecorder,
    /// Why the run aborted, absent for a completed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> TrainingOutput<'a> {
    pub fn new(args: &'a Args, metrics: &'a MetricsRecorder, error: Option<String>) -> Self {
        Self {
            script: env!("CARGO_PKG_NAME"),
            argv: env::args().collect(),
            args,
            metrics,
            error,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        serde_json::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use machine_learning::training::MetricRecord;
    use serde_json::Value;

    use super::*;

    #[test]
    fn serializes_args_metrics_and_error() {
        let args = Args::parse_from(["svrg", "--seed", "4"]);
        let mut metrics = MetricsRecorder::new();
        metrics.append(MetricRecord::Warmup {
            warmup_epoch: 1,
            train_loss: 0.5,
            grad_norm: 0.25,
            examples_per_sec: 10.,
        });

        let done = serde_json::to_value(TrainingOutput::new(&args, &metrics, None)).unwrap();
        assert_eq!(done["script"], "svrg");
        assert_eq!(done["args"]["seed"], 4);
        assert_eq!(done["args"]["loss"], "cross-entropy");
        assert_eq!(done["metrics"][0]["warmup_epoch"], 1);
        assert_eq!(done["metrics"][0]["train_loss"], 0.5);
        assert!(done.get("error").is_none());

        let failed = TrainingOutput::new(&args, &metrics, Some("boom".into()));
        let failed: Value = serde_json::to_value(failed).unwrap();
        assert_eq!(failed["error"], "boom");
    }
}
