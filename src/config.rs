//! Configuration for the set-matching loss engine

use crate::assignment::MatchingPolicy;
use crate::error::ConfigError;
use crate::trajectory::TrajectoryLayout;

/// Configuration for [`crate::loss::TrajectoryLoss`].
///
/// Sizes are fixed here and validated once when the engine is built; calls
/// are then checked against them instead of inferring sizes from tensor
/// shapes.
#[derive(Debug, Clone)]
pub struct LossConfig {
    /// Layout of every trajectory vector
    pub layout: TrajectoryLayout,
    /// Number of trajectory slots per set (expert and predicted alike)
    pub set_size: usize,
    /// Weight of the existence-probability term relative to geometric error
    pub weight_prob: f32,
    /// How expert rows are matched to predicted columns
    pub matching: MatchingPolicy,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            layout: TrajectoryLayout::default(),
            set_size: 3,
            weight_prob: 0.01,
            matching: MatchingPolicy::Optimal,
        }
    }
}

impl LossConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.layout.pos_ctrl_pts == 0 {
            return Err(ConfigError::ZeroPositionPoints);
        }
        if self.set_size == 0 {
            return Err(ConfigError::ZeroSetSize);
        }
        if !self.weight_prob.is_finite() || self.weight_prob < 0.0 {
            return Err(ConfigError::InvalidWeight {
                value: self.weight_prob,
            });
        }
        Ok(())
    }
}
