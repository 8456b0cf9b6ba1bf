//! Pairwise cost volumes between expert and predicted trajectory sets

use burn::prelude::*;
use nalgebra::DMatrix;

use crate::trajectory::TrajectoryLayout;

/// Pairwise dissimilarity volumes for a whole batch, one `[N, K, K]` tensor
/// per sub-metric. Entry `(n, i, j)` compares expert trajectory `i` with
/// predicted trajectory `j` of item `n`.
///
/// Built from differentiable tensor ops, so gradients flow from any cost
/// back into the predicted batch.
#[derive(Debug, Clone)]
pub struct CostVolumes<B: Backend> {
    /// Squared error over everything except the existence indicator,
    /// divided by the full vector length
    pub full: Tensor<B, 3>,
    /// Per-element average squared error over the position control points
    pub pos: Tensor<B, 3>,
    /// Per-element average squared error over the yaw control points;
    /// identically zero when the layout has none
    pub yaw: Tensor<B, 3>,
    /// Squared error between the two time scalars, un-normalized
    pub time: Tensor<B, 3>,
}

impl<B: Backend> CostVolumes<B> {
    /// Build all four volumes for `[N, K, D]` expert and predicted batches.
    ///
    /// Shapes must already be validated against the layout; this is the hot
    /// path and only debug-asserts them.
    pub fn build(
        expert: &Tensor<B, 3>,
        predicted: &Tensor<B, 3>,
        layout: &TrajectoryLayout,
    ) -> Self {
        let [items, slots, width] = expert.dims();
        debug_assert_eq!(predicted.dims(), [items, slots, width]);
        debug_assert_eq!(width, layout.vector_len());

        // All K x K pairs at once: [N, K, 1, D] against [N, 1, K, D].
        let expert_pairs = expert
            .clone()
            .unsqueeze_dim::<4>(2)
            .expand([items, slots, slots, width]);
        let predicted_pairs = predicted
            .clone()
            .unsqueeze_dim::<4>(1)
            .expand([items, slots, slots, width]);
        let squared = (expert_pairs - predicted_pairs).powf_scalar(2.0);

        let pos_len = layout.pos_ctrl_pts;
        let yaw_len = layout.yaw_ctrl_pts;
        let time_index = layout.time_index();

        let full = squared
            .clone()
            .slice([0..items, 0..slots, 0..slots, 0..width - 1])
            .sum_dim(3)
            .squeeze::<3>(3)
            .div_scalar(width as f32);

        let pos = squared
            .clone()
            .slice([0..items, 0..slots, 0..slots, 0..pos_len])
            .sum_dim(3)
            .squeeze::<3>(3)
            .div_scalar(pos_len as f32);

        let yaw = if yaw_len > 0 {
            squared
                .clone()
                .slice([0..items, 0..slots, 0..slots, pos_len..pos_len + yaw_len])
                .sum_dim(3)
                .squeeze::<3>(3)
                .div_scalar(yaw_len as f32)
        } else {
            Tensor::zeros([items, slots, slots], &expert.device())
        };

        let time = squared
            .slice([0..items, 0..slots, 0..slots, time_index..time_index + 1])
            .squeeze::<3>(3);

        Self {
            full,
            pos,
            yaw,
            time,
        }
    }

    /// Copy the position volume to the host as one dense matrix per item.
    ///
    /// This is the hand-off point to the combinatorial solver, which runs on
    /// the host regardless of where the tensor math executed.
    pub fn pos_matrices(&self) -> Vec<DMatrix<f32>> {
        let [items, slots, _] = self.pos.dims();
        let flat: Vec<f32> = self.pos.clone().into_data().to_vec().unwrap();
        (0..items)
            .map(|item| {
                let start = item * slots * slots;
                DMatrix::from_row_slice(slots, slots, &flat[start..start + slots * slots])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn batch(device: &<TestBackend as Backend>::Device, flat: &[f32], dims: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::<TestBackend, 1>::from_floats(flat, device).reshape(dims)
    }

    #[test]
    fn test_single_pair_components() {
        let device = Default::default();
        let layout = TrajectoryLayout::new(2, 1);

        // pos [1, 2], yaw [3], time 4, existence +1 vs pos [1, 1], yaw [3], time 2.
        let expert = batch(&device, &[1.0, 2.0, 3.0, 4.0, 1.0], [1, 1, 5]);
        let predicted = batch(&device, &[1.0, 1.0, 3.0, 2.0, -1.0], [1, 1, 5]);

        let costs = CostVolumes::build(&expert, &predicted, &layout);

        let pos: Vec<f32> = costs.pos.into_data().to_vec().unwrap();
        let yaw: Vec<f32> = costs.yaw.into_data().to_vec().unwrap();
        let time: Vec<f32> = costs.time.into_data().to_vec().unwrap();
        let full: Vec<f32> = costs.full.into_data().to_vec().unwrap();

        assert!((pos[0] - 0.5).abs() < 1e-6);
        assert!((yaw[0] - 0.0).abs() < 1e-6);
        assert!((time[0] - 4.0).abs() < 1e-6);
        // (0 + 1 + 0 + 4) / 5; the existence mismatch never enters.
        assert!((full[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pairwise_orientation() {
        let device = Default::default();
        let layout = TrajectoryLayout::new(1, 0);

        // Experts at 0 and 2, predictions at 1 and 5 (position only).
        let expert = batch(&device, &[0.0, 0.0, 1.0, 2.0, 0.0, 1.0], [1, 2, 3]);
        let predicted = batch(&device, &[1.0, 0.0, 1.0, 5.0, 0.0, 1.0], [1, 2, 3]);

        let costs = CostVolumes::build(&expert, &predicted, &layout);
        let pos: Vec<f32> = costs.pos.into_data().to_vec().unwrap();

        // Row = expert, column = prediction.
        assert!((pos[0] - 1.0).abs() < 1e-6); // (0 - 1)^2
        assert!((pos[1] - 25.0).abs() < 1e-6); // (0 - 5)^2
        assert!((pos[2] - 1.0).abs() < 1e-6); // (2 - 1)^2
        assert!((pos[3] - 9.0).abs() < 1e-6); // (2 - 5)^2
    }

    #[test]
    fn test_yaw_volume_zero_without_yaw_points() {
        let device = Default::default();
        let layout = TrajectoryLayout::new(1, 0);

        let expert = batch(&device, &[1.0, 2.0, 1.0], [1, 1, 3]);
        let predicted = batch(&device, &[4.0, 9.0, 1.0], [1, 1, 3]);

        let costs = CostVolumes::build(&expert, &predicted, &layout);
        let yaw: Vec<f32> = costs.yaw.into_data().to_vec().unwrap();

        assert_eq!(yaw, vec![0.0]);
    }

    #[test]
    fn test_time_is_per_item() {
        let device = Default::default();
        let layout = TrajectoryLayout::new(1, 0);

        // Two items with different time errors; each stays its own.
        let expert = batch(&device, &[0.0, 1.0, 1.0, 0.0, 2.0, 1.0], [2, 1, 3]);
        let predicted = batch(&device, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0], [2, 1, 3]);

        let costs = CostVolumes::build(&expert, &predicted, &layout);
        let time: Vec<f32> = costs.time.into_data().to_vec().unwrap();

        assert!((time[0] - 1.0).abs() < 1e-6);
        assert!((time[1] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_pos_matrices_host_copy() {
        let device = Default::default();
        let layout = TrajectoryLayout::new(1, 0);

        let expert = batch(&device, &[0.0, 0.0, 1.0, 2.0, 0.0, 1.0], [1, 2, 3]);
        let predicted = batch(&device, &[1.0, 0.0, 1.0, 5.0, 0.0, 1.0], [1, 2, 3]);

        let costs = CostVolumes::build(&expert, &predicted, &layout);
        let matrices = costs.pos_matrices();

        assert_eq!(matrices.len(), 1);
        assert_eq!(matrices[0].nrows(), 2);
        assert!((matrices[0][(0, 1)] - 25.0).abs() < 1e-6);
        assert!((matrices[0][(1, 0)] - 1.0).abs() < 1e-6);
    }
}
