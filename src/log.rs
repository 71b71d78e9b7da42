//! Metric logging backends for influence diagnostics.

use std::collections::HashMap;

use crate::trajectory::PostprocessedTrajectory;

/// Trait for logging metrics to various backends.
pub trait MetricLogger: Send + Sync {
    /// Log a set of metrics collected in a map.
    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64);

    /// Close the logger and flush any pending writes.
    fn close(&self) {}
}

/// A logger that does nothing (default).
pub struct NoOpLogger;

impl MetricLogger for NoOpLogger {
    fn log_metrics(&self, _metrics: &HashMap<String, f64>, _step: u64) {}
}

/// Logger that prints metrics to stdout via tracing.
#[derive(Default)]
pub struct ConsoleLogger;

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }
}

impl MetricLogger for ConsoleLogger {
    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        // Group output to avoid spamming lines
        let mut output = format!("Step {}: ", step);
        let mut sorted_keys: Vec<_> = metrics.keys().collect();
        sorted_keys.sort();

        for (i, key) in sorted_keys.iter().enumerate() {
            if i > 0 {
                output.push_str(", ");
            }
            if let Some(value) = metrics.get(*key) {
                output.push_str(&format!("{}={:.4}", key, value));
            }
        }

        tracing::info!("{}", output);
    }
}

/// A composite logger that dispatches to multiple backends.
pub struct CompositeLogger {
    loggers: Vec<Box<dyn MetricLogger>>,
}

impl CompositeLogger {
    pub fn new(loggers: Vec<Box<dyn MetricLogger>>) -> Self {
        Self { loggers }
    }

    pub fn add(&mut self, logger: Box<dyn MetricLogger>) {
        self.loggers.push(logger);
    }
}

impl MetricLogger for CompositeLogger {
    fn log_metrics(&self, metrics: &HashMap<String, f64>, step: u64) {
        for logger in &self.loggers {
            logger.log_metrics(metrics, step);
        }
    }

    fn close(&self) {
        for logger in &self.loggers {
            logger.close();
        }
    }
}

/// Log the diagnostics of a processed trajectory.
pub fn log_trajectory(
    logger: &dyn MetricLogger,
    processed: &PostprocessedTrajectory,
    moa_loss: Option<f32>,
    step: u64,
) {
    logger.log_metrics(&processed.metrics(moa_loss), step);
}
