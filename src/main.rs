use std::env;

use burn::backend::{Autodiff, NdArray};
use dotenv::dotenv;
use rand::Rng;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use multitraj::{
    BCTrainer, CsvLogger, DemoCollector, LossConfig, PolicyConfig, TrainerConfig, TrajectoryLayout,
};

type TrainingBackend = Autodiff<NdArray>;

fn get_env_var_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|val| val.parse::<usize>().ok())
}

fn get_env_var_f32(key: &str) -> Option<f32> {
    env::var(key).ok().and_then(|val| val.parse::<f32>().ok())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("multitraj=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Generate a synthetic expert dataset: each observation seeds a handful of
/// spline coefficients, and a couple of slots per set are marked
/// non-existent so the existence loss has both branches to learn.
fn generate_demos(
    layout: &TrajectoryLayout,
    set_size: usize,
    obs_size: usize,
    num_demos: usize,
) -> DemoCollector {
    let mut rng = rand::rng();
    let mut collector = DemoCollector::new(*layout, set_size, obs_size);

    for _ in 0..num_demos {
        let observation: Vec<f32> = (0..obs_size).map(|_| rng.random_range(-1.0..1.0)).collect();

        let mut trajectories = Vec::with_capacity(set_size);
        for slot in 0..set_size {
            let exists = slot == 0 || rng.random_range(0.0..1.0) < 0.7;
            let mut trajectory = Vec::with_capacity(layout.vector_len());
            if exists {
                // Control points correlated with the observation, plus noise.
                for index in 0..layout.pos_ctrl_pts + layout.yaw_ctrl_pts {
                    let base = observation[index % obs_size];
                    trajectory.push(base + 0.1 * slot as f32 + rng.random_range(-0.05..0.05));
                }
                trajectory.push(rng.random_range(1.0..5.0)); // time
                trajectory.push(1.0);
            } else {
                trajectory.resize(layout.vector_len() - 1, 0.0);
                trajectory.push(-1.0);
            }
            trajectories.push(trajectory);
        }

        collector
            .add_demo(observation, trajectories)
            .expect("synthetic demo matches the layout");
    }

    collector
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let pos_ctrl_pts = get_env_var_usize("MULTITRAJ_POS_CTRL_PTS").unwrap_or(15);
    let yaw_ctrl_pts = get_env_var_usize("MULTITRAJ_YAW_CTRL_PTS").unwrap_or(6);
    let set_size = get_env_var_usize("MULTITRAJ_SET_SIZE").unwrap_or(3);
    let obs_size = get_env_var_usize("MULTITRAJ_OBS_SIZE").unwrap_or(16);
    let num_demos = get_env_var_usize("MULTITRAJ_NUM_DEMOS").unwrap_or(512);
    let n_epochs = get_env_var_usize("MULTITRAJ_EPOCHS").unwrap_or(20);
    let batch_size = get_env_var_usize("MULTITRAJ_BATCH_SIZE").unwrap_or(32);
    let weight_prob = get_env_var_f32("MULTITRAJ_WEIGHT_PROB").unwrap_or(0.01);
    let save_path = env::var("MULTITRAJ_SAVE_PATH").ok();
    let log_dir = env::var("MULTITRAJ_LOG_DIR").ok();

    let layout = TrajectoryLayout::new(pos_ctrl_pts, yaw_ctrl_pts);
    tracing::info!(
        "Training a {}-hypothesis policy, trajectory vectors of length {}",
        set_size,
        layout.vector_len()
    );

    let collector = generate_demos(&layout, set_size, obs_size, num_demos);
    tracing::info!("Generated {} synthetic demonstrations", collector.len());
    let dataset = collector.into_dataset();

    let loss_config = LossConfig {
        layout,
        set_size,
        weight_prob,
        ..LossConfig::default()
    };
    let trainer_config = TrainerConfig {
        n_epochs: Some(n_epochs),
        n_batches: None,
        batch_size,
        log_interval: 50,
        save_path,
        policy_config: PolicyConfig::default(),
        ..TrainerConfig::default()
    };

    let device = Default::default();
    let mut trainer =
        BCTrainer::<TrainingBackend>::new(device, obs_size, loss_config, trainer_config)?;

    let avg_loss = trainer.train(&dataset)?;
    trainer.metrics().log_to_console();

    if let Some(dir) = log_dir {
        let mut logger = CsvLogger::new(&dir);
        logger.log_metrics(trainer.metrics());
        logger.close();
    }

    tracing::info!("Finished: average loss {:.4}", avg_loss);
    Ok(())
}
