//! Training metrics and scalar logging

use std::collections::VecDeque;
use std::path::Path;
use std::time::Instant;

use crate::loss::LossBreakdown;

/// Moving average calculator
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<f32>,
    window_size: usize,
    sum: f32,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() >= self.window_size {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f32
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Windowed view of the loss breakdown over recent batches
#[derive(Debug)]
pub struct TrainingMetrics {
    /// Total loss
    pub loss: MovingAverage,
    /// Matched position cost
    pub pos_loss: MovingAverage,
    /// Matched yaw cost
    pub yaw_loss: MovingAverage,
    /// Matched time cost
    pub time_loss: MovingAverage,
    /// Existence-probability cost
    pub prob_loss: MovingAverage,
    /// Batches processed so far
    pub batches: usize,
    /// Samples processed so far
    pub samples: usize,
    /// Training start time
    start_time: Instant,
}

impl TrainingMetrics {
    pub fn new(window_size: usize) -> Self {
        Self {
            loss: MovingAverage::new(window_size),
            pos_loss: MovingAverage::new(window_size),
            yaw_loss: MovingAverage::new(window_size),
            time_loss: MovingAverage::new(window_size),
            prob_loss: MovingAverage::new(window_size),
            batches: 0,
            samples: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one batch's loss breakdown
    pub fn record(&mut self, breakdown: &LossBreakdown, batch_size: usize) {
        self.loss.push(breakdown.loss);
        self.pos_loss.push(breakdown.pos_loss);
        self.yaw_loss.push(breakdown.yaw_loss);
        self.time_loss.push(breakdown.time_loss);
        self.prob_loss.push(breakdown.prob_loss);
        self.batches += 1;
        self.samples += batch_size;
    }

    /// Get training duration in seconds
    pub fn training_duration_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Get batches per second
    pub fn batches_per_second(&self) -> f64 {
        let duration = self.training_duration_secs();
        if duration > 0.0 {
            self.batches as f64 / duration
        } else {
            0.0
        }
    }

    /// Log current metrics to console
    pub fn log_to_console(&self) {
        tracing::info!(
            "Batch {} | Samples {} | BPS {:.1}",
            self.batches,
            self.samples,
            self.batches_per_second()
        );
        tracing::info!(
            "  Losses: total={:.4}, pos={:.4}, yaw={:.4}, time={:.4}, prob={:.4}",
            self.loss.average(),
            self.pos_loss.average(),
            self.yaw_loss.average(),
            self.time_loss.average(),
            self.prob_loss.average()
        );
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new(100)
    }
}

/// File-based scalar logger, one `step,value` CSV per tag
pub struct CsvLogger {
    log_dir: String,
}

impl CsvLogger {
    pub fn new(log_dir: &str) -> Self {
        std::fs::create_dir_all(log_dir).ok();

        Self {
            log_dir: log_dir.to_string(),
        }
    }

    /// Log a scalar value
    pub fn log_scalar(&mut self, tag: &str, value: f32, step: usize) {
        let csv_path = format!("{}/{}.csv", self.log_dir, tag.replace('/', "_"));

        let file_exists = Path::new(&csv_path).exists();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&csv_path)
            .ok();

        if let Some(ref mut f) = file {
            use std::io::Write;
            if !file_exists {
                writeln!(f, "step,value").ok();
            }
            writeln!(f, "{},{}", step, value).ok();
        }
    }

    /// Log the windowed averages of every loss component at once
    pub fn log_metrics(&mut self, metrics: &TrainingMetrics) {
        let step = metrics.batches;

        self.log_scalar("loss/total", metrics.loss.average(), step);
        self.log_scalar("loss/pos", metrics.pos_loss.average(), step);
        self.log_scalar("loss/yaw", metrics.yaw_loss.average(), step);
        self.log_scalar("loss/time", metrics.time_loss.average(), step);
        self.log_scalar("loss/prob", metrics.prob_loss.average(), step);
    }

    /// Flush and close the logger
    pub fn close(&mut self) {
        tracing::info!("Scalar logs saved to {}", self.log_dir);
    }
}
