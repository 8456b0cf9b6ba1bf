//! Set-matching loss over expert and predicted trajectory sets

use burn::prelude::*;

use crate::assignment::assign;
use crate::config::LossConfig;
use crate::cost::CostVolumes;
use crate::error::ShapeError;

/// Plain-number view of one loss evaluation, for logging and metrics.
///
/// These carry no gradient information; the differentiable value is the
/// scalar tensor returned next to this struct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossBreakdown {
    /// Total loss: matched full cost plus the weighted existence loss
    pub loss: f32,
    /// Matched position cost
    pub pos_loss: f32,
    /// Matched yaw cost
    pub yaw_loss: f32,
    /// Matched time cost
    pub time_loss: f32,
    /// Existence-probability cost over all predicted slots
    pub prob_loss: f32,
}

/// The set-matching loss engine.
///
/// For every batch item it builds pairwise cost volumes, matches valid
/// expert trajectories to predicted slots by minimum position cost, and
/// aggregates the matched regression error with an existence-probability
/// error over every predicted slot. The engine holds only its
/// configuration; nothing persists between calls.
#[derive(Debug, Clone)]
pub struct TrajectoryLoss {
    config: LossConfig,
}

impl TrajectoryLoss {
    pub fn new(config: LossConfig) -> Result<Self, crate::error::ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LossConfig {
        &self.config
    }

    /// Compute the loss for one batch.
    ///
    /// `expert` and `predicted` must both be `[N, K, P + Y + 2]` with the
    /// configured `K` and layout. Returns the differentiable scalar and the
    /// numeric breakdown. NaN or infinite inputs are not masked; they
    /// surface in the returned values.
    pub fn compute<B: Backend>(
        &self,
        expert: Tensor<B, 3>,
        predicted: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 1>, LossBreakdown), ShapeError> {
        let [items, slots, width] = expert.dims();
        let [predicted_items, predicted_slots, predicted_width] = predicted.dims();

        if items != predicted_items {
            return Err(ShapeError::BatchSize {
                expert: items,
                predicted: predicted_items,
            });
        }
        if items == 0 {
            return Err(ShapeError::EmptyBatch);
        }
        for actual in [slots, predicted_slots] {
            if actual != self.config.set_size {
                return Err(ShapeError::SetSize {
                    expected: self.config.set_size,
                    actual,
                });
            }
        }
        for actual in [width, predicted_width] {
            if actual != self.config.layout.vector_len() {
                return Err(ShapeError::TrajectoryLength {
                    expected: self.config.layout.vector_len(),
                    actual,
                });
            }
        }

        let device = predicted.device();
        let costs = CostVolumes::build(&expert, &predicted, &self.config.layout);

        // Position costs and expert validity cross to the host for the
        // combinatorial solve; the result crosses back as constant masks.
        let pos_matrices = costs.pos_matrices();
        let existence: Vec<f32> = expert
            .clone()
            .slice([0..items, 0..slots, width - 1..width])
            .squeeze::<2>(2)
            .into_data()
            .to_vec()
            .unwrap();

        let mut matched = vec![0.0f32; items * slots * slots];
        let mut assigned_columns = vec![0.0f32; items * slots];
        for item in 0..items {
            let valid: Vec<bool> = existence[item * slots..(item + 1) * slots]
                .iter()
                .map(|indicator| indicator.round() == 1.0)
                .collect();
            let assignment = assign(&pos_matrices[item], &valid, self.config.matching);
            for &(row, column) in assignment.pairs() {
                matched[item * slots * slots + row * slots + column] = 1.0;
                assigned_columns[item * slots + column] = 1.0;
            }
        }

        let alpha = Tensor::<B, 1>::from_floats(matched.as_slice(), &device)
            .reshape([items, slots, slots]);
        let assigned =
            Tensor::<B, 1>::from_floats(assigned_columns.as_slice(), &device)
                .reshape([items, slots]);
        let unassigned = Tensor::ones_like(&assigned) - assigned.clone();

        let norm = 1.0 / (items as f32 * slots as f32);

        let matched_full = (alpha.clone() * costs.full).sum().mul_scalar(norm);
        let matched_pos = (alpha.clone() * costs.pos).sum().mul_scalar(norm);
        let matched_yaw = (alpha.clone() * costs.yaw).sum().mul_scalar(norm);
        let matched_time = (alpha * costs.time).sum().mul_scalar(norm);

        // Assigned slots are pulled toward +1, unassigned toward -1. The
        // unassigned term is a raw sum, not an average.
        let scores = predicted
            .slice([0..items, 0..slots, width - 1..width])
            .squeeze::<2>(2);
        let assigned_term = (assigned * scores.clone().sub_scalar(1.0).powf_scalar(2.0))
            .sum()
            .mul_scalar(norm);
        let unassigned_term = (unassigned * scores.add_scalar(1.0).powf_scalar(2.0)).sum();
        let prob = assigned_term + unassigned_term;

        let loss = matched_full.clone() + prob.clone().mul_scalar(self.config.weight_prob);

        let breakdown = LossBreakdown {
            loss: scalar(&loss),
            pos_loss: scalar(&matched_pos),
            yaw_loss: scalar(&matched_yaw),
            time_loss: scalar(&matched_time),
            prob_loss: scalar(&prob),
        };

        Ok((loss, breakdown))
    }
}

fn scalar<B: Backend>(value: &Tensor<B, 1>) -> f32 {
    value.clone().into_data().to_vec::<f32>().unwrap()[0]
}
