//! Behavioral cloning trainer for multi-hypothesis trajectory policies

use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::AutodiffBackend;

use crate::config::LossConfig;
use crate::dataset::{DemoDataset, Demonstration};
use crate::error::{ConfigError, ShapeError};
use crate::loss::{LossBreakdown, TrajectoryLoss};
use crate::metrics::TrainingMetrics;
use crate::policy::{PolicyConfig, TrajectoryPolicy};

/// Configuration for behavioral cloning
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Number of passes over the dataset; exclusive with `n_batches`
    pub n_epochs: Option<usize>,
    /// Number of sampled batches; exclusive with `n_epochs`
    pub n_batches: Option<usize>,
    /// Batch size
    pub batch_size: usize,
    /// Learning rate
    pub learning_rate: f64,
    /// Log (and snapshot) frequency in batches
    pub log_interval: usize,
    /// Path prefix for policy snapshots; no checkpointing when unset
    pub save_path: Option<String>,
    /// Policy network configuration
    pub policy_config: PolicyConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_epochs: Some(100),
            n_batches: None,
            batch_size: 32,
            learning_rate: 1e-3,
            log_interval: 500,
            save_path: None,
            policy_config: PolicyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Schedule {
    Epochs(usize),
    Batches(usize),
}

/// Behavioral cloning trainer.
///
/// Owns the policy and the loss engine; every batch is one forward pass,
/// one loss evaluation, and one Adam step on the returned scalar.
pub struct BCTrainer<B: AutodiffBackend> {
    policy: TrajectoryPolicy<B>,
    engine: TrajectoryLoss,
    config: TrainerConfig,
    schedule: Schedule,
    metrics: TrainingMetrics,
    device: B::Device,
}

impl<B: AutodiffBackend> BCTrainer<B> {
    pub fn new(
        device: B::Device,
        obs_size: usize,
        loss_config: LossConfig,
        config: TrainerConfig,
    ) -> Result<Self, ConfigError> {
        let schedule = match (config.n_epochs, config.n_batches) {
            (Some(epochs), None) => Schedule::Epochs(epochs),
            (None, Some(batches)) => Schedule::Batches(batches),
            _ => return Err(ConfigError::AmbiguousSchedule),
        };

        let engine = TrajectoryLoss::new(loss_config)?;
        let policy = TrajectoryPolicy::new(
            &device,
            obs_size,
            &engine.config().layout,
            engine.config().set_size,
            &config.policy_config,
        );

        Ok(Self {
            policy,
            engine,
            config,
            schedule,
            metrics: TrainingMetrics::default(),
            device,
        })
    }

    /// Train the policy on expert demonstrations, returning the average loss.
    pub fn train(&mut self, dataset: &DemoDataset) -> Result<f32, ShapeError> {
        if dataset.is_empty() {
            tracing::warn!("Empty demonstration dataset, skipping training");
            return Ok(0.0);
        }

        let (epochs, batches_per_epoch) = match self.schedule {
            Schedule::Epochs(epochs) => {
                (epochs, dataset.len().div_ceil(self.config.batch_size))
            }
            Schedule::Batches(batches) => (1, batches),
        };

        tracing::info!(
            "Starting training on {} demonstrations ({} epochs x {} batches)",
            dataset.len(),
            epochs,
            batches_per_epoch
        );

        let optim_config = AdamConfig::new();
        let mut optimizer = optim_config.init::<B, TrajectoryPolicy<B>>();

        let mut total_loss = 0.0;
        let mut num_batches = 0usize;

        for epoch in 0..epochs {
            for _ in 0..batches_per_epoch {
                let batch = dataset.sample_batch(self.config.batch_size);
                if batch.is_empty() {
                    continue;
                }

                let breakdown = self.train_batch(&batch, &mut optimizer)?;
                self.metrics.record(&breakdown, batch.len());
                total_loss += breakdown.loss;
                num_batches += 1;

                if num_batches % self.config.log_interval == 0 {
                    tracing::info!(
                        "Epoch {}, Batch {}: loss={:.4}, pos={:.4}, yaw={:.4}, time={:.4}, prob={:.4}",
                        epoch,
                        num_batches,
                        breakdown.loss,
                        breakdown.pos_loss,
                        breakdown.yaw_loss,
                        breakdown.time_loss,
                        breakdown.prob_loss
                    );
                    if let Some(path) = self.config.save_path.clone() {
                        let snapshot = num_batches / self.config.log_interval;
                        self.save_policy(&format!("{}_log{}", path, snapshot));
                    }
                }
            }
        }

        if let Some(path) = self.config.save_path.clone() {
            self.save_policy(&path);
        }

        let avg_loss = if num_batches > 0 {
            total_loss / num_batches as f32
        } else {
            0.0
        };

        tracing::info!("Training complete: avg_loss = {:.4}", avg_loss);
        Ok(avg_loss)
    }

    /// Train on a single batch
    fn train_batch<O: Optimizer<TrajectoryPolicy<B>, B>>(
        &mut self,
        batch: &[&Demonstration],
        optimizer: &mut O,
    ) -> Result<LossBreakdown, ShapeError> {
        let obs = self.obs_to_tensor(batch);
        let expert = self.expert_to_tensor(batch);

        let predicted = self.policy.forward(obs);
        let (loss, breakdown) = self.engine.compute(expert, predicted)?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.policy);
        self.policy = optimizer.step(self.config.learning_rate, self.policy.clone(), grads);

        Ok(breakdown)
    }

    /// Save the policy weights
    pub fn save_policy(&self, path: &str) {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.policy
            .clone()
            .save_file(path, &recorder)
            .expect("Failed to save policy");
        tracing::info!("Saved policy to {}", path);
    }

    /// Load policy weights saved by `save_policy`
    pub fn load_policy(&mut self, path: &str) {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.policy = self
            .policy
            .clone()
            .load_file(path, &recorder, &self.device)
            .expect("Failed to load policy");
        tracing::info!("Loaded policy from {}", path);
    }

    /// Get a reference to the policy
    pub fn policy(&self) -> &TrajectoryPolicy<B> {
        &self.policy
    }

    /// Get the trained policy (consumes the trainer)
    pub fn into_policy(self) -> TrajectoryPolicy<B> {
        self.policy
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    // Helper functions for tensor conversion

    fn obs_to_tensor(&self, batch: &[&Demonstration]) -> Tensor<B, 2> {
        let batch_size = batch.len();
        let obs_size = batch[0].observation.len();
        let flat: Vec<f32> = batch
            .iter()
            .flat_map(|demo| demo.observation.iter().copied())
            .collect();
        Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device).reshape([batch_size, obs_size])
    }

    fn expert_to_tensor(&self, batch: &[&Demonstration]) -> Tensor<B, 3> {
        let batch_size = batch.len();
        let set_size = self.engine.config().set_size;
        let vector_len = self.engine.config().layout.vector_len();
        let flat: Vec<f32> = batch
            .iter()
            .flat_map(|demo| demo.expert.flatten())
            .collect();
        Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device).reshape([
            batch_size,
            set_size,
            vector_len,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{TrajectoryLayout, TrajectorySet};

    type TestBackend = burn::backend::Autodiff<burn::backend::NdArray>;

    fn small_loss_config() -> LossConfig {
        LossConfig {
            layout: TrajectoryLayout::new(1, 0),
            set_size: 2,
            weight_prob: 0.01,
            ..LossConfig::default()
        }
    }

    fn small_trainer_config() -> TrainerConfig {
        TrainerConfig {
            n_epochs: None,
            n_batches: Some(3),
            batch_size: 2,
            learning_rate: 1e-2,
            log_interval: 1000,
            save_path: None,
            policy_config: PolicyConfig {
                hidden_size: 8,
                num_layers: 1,
            },
        }
    }

    #[test]
    fn test_trainer_config_default() {
        let config = TrainerConfig::default();
        assert_eq!(config.n_epochs, Some(100));
        assert_eq!(config.n_batches, None);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.log_interval, 500);
    }

    #[test]
    fn test_schedule_must_be_unambiguous() {
        let device = Default::default();

        let both = TrainerConfig {
            n_epochs: Some(1),
            n_batches: Some(1),
            ..small_trainer_config()
        };
        let result =
            BCTrainer::<TestBackend>::new(device, 2, small_loss_config(), both);
        assert!(matches!(result, Err(ConfigError::AmbiguousSchedule)));

        let device = Default::default();
        let neither = TrainerConfig {
            n_epochs: None,
            n_batches: None,
            ..small_trainer_config()
        };
        let result =
            BCTrainer::<TestBackend>::new(device, 2, small_loss_config(), neither);
        assert!(matches!(result, Err(ConfigError::AmbiguousSchedule)));
    }

    #[test]
    fn test_train_on_empty_dataset_is_a_no_op() {
        let device = Default::default();
        let mut trainer =
            BCTrainer::<TestBackend>::new(device, 2, small_loss_config(), small_trainer_config())
                .unwrap();

        let dataset = DemoDataset::new(TrajectoryLayout::new(1, 0), 2, 2);
        let avg = trainer.train(&dataset).unwrap();
        assert_eq!(avg, 0.0);
        assert_eq!(trainer.metrics().batches, 0);
    }

    #[test]
    fn test_train_smoke() {
        let device = Default::default();
        let layout = TrajectoryLayout::new(1, 0);
        let mut trainer =
            BCTrainer::<TestBackend>::new(device, 2, small_loss_config(), small_trainer_config())
                .unwrap();

        let mut dataset = DemoDataset::new(layout, 2, 2);
        for index in 0..4 {
            let offset = index as f32;
            let expert = TrajectorySet::new(
                vec![
                    vec![offset, 1.0, 1.0],
                    vec![offset + 1.0, 2.0, -1.0],
                ],
                &layout,
            )
            .unwrap();
            dataset
                .add(Demonstration {
                    observation: vec![offset, -offset],
                    expert,
                })
                .unwrap();
        }

        let avg = trainer.train(&dataset).unwrap();
        assert!(avg.is_finite());
        assert_eq!(trainer.metrics().batches, 3);
        assert!(trainer.metrics().loss.average().is_finite());
    }
}
