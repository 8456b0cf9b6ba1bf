//! Trajectory vector layout and zero-copy codec

use crate::error::ShapeError;

/// Describes how a flat trajectory vector is laid out.
///
/// A trajectory occupies `pos_ctrl_pts + yaw_ctrl_pts + 2` contiguous floats:
/// position control points first, then yaw control points, then the time
/// scalar, then the existence indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrajectoryLayout {
    /// Number of position control points
    pub pos_ctrl_pts: usize,
    /// Number of yaw control points (may be zero)
    pub yaw_ctrl_pts: usize,
}

impl Default for TrajectoryLayout {
    fn default() -> Self {
        Self {
            pos_ctrl_pts: 15,
            yaw_ctrl_pts: 6,
        }
    }
}

impl TrajectoryLayout {
    pub fn new(pos_ctrl_pts: usize, yaw_ctrl_pts: usize) -> Self {
        Self {
            pos_ctrl_pts,
            yaw_ctrl_pts,
        }
    }

    /// Total length of a flat trajectory vector
    pub fn vector_len(&self) -> usize {
        self.pos_ctrl_pts + self.yaw_ctrl_pts + 2
    }

    /// Index of the time scalar
    pub fn time_index(&self) -> usize {
        self.pos_ctrl_pts + self.yaw_ctrl_pts
    }

    /// Index of the existence indicator
    pub fn existence_index(&self) -> usize {
        self.pos_ctrl_pts + self.yaw_ctrl_pts + 1
    }

    /// Split a flat vector into its components without copying.
    pub fn view<'a>(&self, raw: &'a [f32]) -> Result<TrajectoryView<'a>, ShapeError> {
        if raw.len() != self.vector_len() {
            return Err(ShapeError::TrajectoryLength {
                expected: self.vector_len(),
                actual: raw.len(),
            });
        }
        Ok(TrajectoryView {
            position: &raw[..self.pos_ctrl_pts],
            yaw: &raw[self.pos_ctrl_pts..self.time_index()],
            time: raw[self.time_index()],
            existence: raw[self.existence_index()],
        })
    }
}

/// Borrowed view of one trajectory's components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryView<'a> {
    /// Position control points
    pub position: &'a [f32],
    /// Yaw control points
    pub yaw: &'a [f32],
    /// Time scalar
    pub time: f32,
    /// Existence indicator; exactly +1/-1 for experts, a free score for predictions
    pub existence: f32,
}

impl TrajectoryView<'_> {
    /// Whether this slot holds a real trajectory (indicator rounds to +1)
    pub fn exists(&self) -> bool {
        self.existence.round() == 1.0
    }
}

/// An ordered set of trajectories for one batch item.
///
/// Every entry is validated against the layout when the set is built, so
/// downstream code can flatten and slice without re-checking lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySet {
    trajectories: Vec<Vec<f32>>,
}

impl TrajectorySet {
    pub fn new(
        trajectories: Vec<Vec<f32>>,
        layout: &TrajectoryLayout,
    ) -> Result<Self, ShapeError> {
        for trajectory in &trajectories {
            if trajectory.len() != layout.vector_len() {
                return Err(ShapeError::TrajectoryLength {
                    expected: layout.vector_len(),
                    actual: trajectory.len(),
                });
            }
        }
        Ok(Self { trajectories })
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[f32]> {
        self.trajectories.get(index).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.trajectories.iter().map(Vec::as_slice)
    }

    /// View one slot through the layout codec.
    pub fn view<'a>(
        &'a self,
        index: usize,
        layout: &TrajectoryLayout,
    ) -> Result<TrajectoryView<'a>, ShapeError> {
        layout.view(&self.trajectories[index])
    }

    /// Concatenate all slots into one flat buffer (`len * vector_len` floats).
    pub fn flatten(&self) -> Vec<f32> {
        self.trajectories.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_indices() {
        let layout = TrajectoryLayout::new(3, 2);
        assert_eq!(layout.vector_len(), 7);
        assert_eq!(layout.time_index(), 5);
        assert_eq!(layout.existence_index(), 6);
    }

    #[test]
    fn test_view_splits_components() {
        let layout = TrajectoryLayout::new(3, 2);
        let raw = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 1.0];

        let view = layout.view(&raw).unwrap();
        assert_eq!(view.position, &[1.0, 2.0, 3.0]);
        assert_eq!(view.yaw, &[4.0, 5.0]);
        assert_eq!(view.time, 6.0);
        assert_eq!(view.existence, 1.0);
        assert!(view.exists());
    }

    #[test]
    fn test_view_without_yaw_points() {
        let layout = TrajectoryLayout::new(2, 0);
        let raw = [1.0, 2.0, 3.0, -1.0];

        let view = layout.view(&raw).unwrap();
        assert_eq!(view.position, &[1.0, 2.0]);
        assert!(view.yaw.is_empty());
        assert_eq!(view.time, 3.0);
        assert!(!view.exists());
    }

    #[test]
    fn test_view_rejects_wrong_length() {
        let layout = TrajectoryLayout::new(3, 2);
        let raw = [1.0, 2.0, 3.0];

        let result = layout.view(&raw);
        assert_eq!(
            result,
            Err(ShapeError::TrajectoryLength {
                expected: 7,
                actual: 3
            })
        );
    }

    #[test]
    fn test_set_validates_entries() {
        let layout = TrajectoryLayout::new(1, 0);
        let good = TrajectorySet::new(vec![vec![0.0, 1.0, 1.0], vec![2.0, 3.0, -1.0]], &layout);
        assert!(good.is_ok());

        let bad = TrajectorySet::new(vec![vec![0.0, 1.0]], &layout);
        assert!(bad.is_err());
    }

    #[test]
    fn test_set_flatten_preserves_order() {
        let layout = TrajectoryLayout::new(1, 0);
        let set =
            TrajectorySet::new(vec![vec![0.0, 1.0, 1.0], vec![2.0, 3.0, -1.0]], &layout).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.flatten(), vec![0.0, 1.0, 1.0, 2.0, 3.0, -1.0]);
        assert_eq!(set.get(1), Some([2.0, 3.0, -1.0].as_slice()));
    }
}
