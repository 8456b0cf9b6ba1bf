pub mod assignment;
pub mod config;
pub mod cost;
pub mod dataset;
pub mod error;
pub mod loss;
pub mod metrics;
pub mod policy;
pub mod trainer;
pub mod trajectory;

// Re-export commonly used types for convenience
pub use assignment::{Assignment, MatchingPolicy, assign};
pub use config::LossConfig;
pub use cost::CostVolumes;
pub use dataset::{DemoCollector, DemoDataset, Demonstration};
pub use error::{ConfigError, ShapeError};
pub use loss::{LossBreakdown, TrajectoryLoss};
pub use metrics::{CsvLogger, MovingAverage, TrainingMetrics};
pub use policy::{PolicyConfig, TrajectoryPolicy};
pub use trainer::{BCTrainer, TrainerConfig};
pub use trajectory::{TrajectoryLayout, TrajectorySet, TrajectoryView};
