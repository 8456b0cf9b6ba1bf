//! Expert demonstration dataset for behavioral cloning

use rand::seq::IndexedRandom;

use crate::error::ShapeError;
use crate::trajectory::{TrajectoryLayout, TrajectorySet};

/// A single expert demonstration: one observation and the trajectory set
/// the expert proposed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Demonstration {
    /// Observation features
    pub observation: Vec<f32>,
    /// Expert trajectory set; non-existent slots carry existence -1
    pub expert: TrajectorySet,
}

/// Dataset of expert demonstrations.
///
/// Every demonstration is validated on insertion against the configured
/// layout and sizes, so training never has to re-check shapes.
pub struct DemoDataset {
    layout: TrajectoryLayout,
    set_size: usize,
    obs_size: usize,
    demos: Vec<Demonstration>,
}

impl DemoDataset {
    pub fn new(layout: TrajectoryLayout, set_size: usize, obs_size: usize) -> Self {
        Self {
            layout,
            set_size,
            obs_size,
            demos: Vec::new(),
        }
    }

    pub fn layout(&self) -> &TrajectoryLayout {
        &self.layout
    }

    pub fn set_size(&self) -> usize {
        self.set_size
    }

    pub fn obs_size(&self) -> usize {
        self.obs_size
    }

    /// Add a demonstration, rejecting anything that does not match the
    /// configured observation size, set size, layout, or whose expert
    /// existence indicators do not round to +1/-1.
    pub fn add(&mut self, demo: Demonstration) -> Result<(), ShapeError> {
        if demo.observation.len() != self.obs_size {
            return Err(ShapeError::ObservationLength {
                expected: self.obs_size,
                actual: demo.observation.len(),
            });
        }
        if demo.expert.len() != self.set_size {
            return Err(ShapeError::SetSize {
                expected: self.set_size,
                actual: demo.expert.len(),
            });
        }
        for slot in 0..demo.expert.len() {
            let view = demo.expert.view(slot, &self.layout)?;
            let rounded = view.existence.round();
            if rounded != 1.0 && rounded != -1.0 {
                return Err(ShapeError::ExistenceIndicator {
                    value: view.existence,
                });
            }
        }
        self.demos.push(demo);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.demos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demos.is_empty()
    }

    /// Get a random batch of demonstrations
    pub fn sample_batch(&self, batch_size: usize) -> Vec<&Demonstration> {
        let mut rng = rand::rng();
        let batch_size = batch_size.min(self.demos.len());

        self.demos.choose_multiple(&mut rng, batch_size).collect()
    }

    /// Iterate over all demonstrations
    pub fn iter(&self) -> impl Iterator<Item = &Demonstration> {
        self.demos.iter()
    }
}

/// Collector that assembles raw expert output into a validated dataset.
pub struct DemoCollector {
    dataset: DemoDataset,
}

impl DemoCollector {
    pub fn new(layout: TrajectoryLayout, set_size: usize, obs_size: usize) -> Self {
        Self {
            dataset: DemoDataset::new(layout, set_size, obs_size),
        }
    }

    /// Add a demonstration from raw flat trajectory vectors.
    pub fn add_demo(
        &mut self,
        observation: Vec<f32>,
        trajectories: Vec<Vec<f32>>,
    ) -> Result<(), ShapeError> {
        let expert = TrajectorySet::new(trajectories, self.dataset.layout())?;
        self.dataset.add(Demonstration {
            observation,
            expert,
        })
    }

    /// Get the collected dataset
    pub fn into_dataset(self) -> DemoDataset {
        self.dataset
    }

    /// Get a reference to the dataset
    pub fn dataset(&self) -> &DemoDataset {
        &self.dataset
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }
}
