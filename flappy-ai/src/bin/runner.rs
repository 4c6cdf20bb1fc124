use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use flappy_ai::environment::flappy_simulation::FlappySimulation;
use flappy_ai::model_process::{ModelProcess, ModelProcessParameter};
use flappy_ai::progress::ProgressStore;
use flappy_ai::supervisor::{Supervisor, SupervisorParameter};
use ql::ml_model::NetworkType;
use ql::util::logging::init_logging;

const EPISODES: usize = 10_000;
const MAX_WORKERS: usize = 1;
const SAVE_DIR: &str = "save";

fn main() -> Result<()> {
    init_logging();

    let save_dir = PathBuf::from(SAVE_DIR);
    let mut model = ModelProcess::new(ModelProcessParameter {
        save_dir: save_dir.clone(),
        ..Default::default()
    });
    model.start(NetworkType::Dqn)?;

    let supervisor = Supervisor::new(
        SupervisorParameter {
            target_episodes: EPISODES,
            max_workers: MAX_WORKERS,
            ..Default::default()
        },
        Arc::new(|| Ok(FlappySimulation::new())),
        model,
        ProgressStore::in_dir(&save_dir),
    );

    let summary = supervisor.run()?;
    log::info!("spawned {} game workers in this run", summary.spawned_episodes.len());
    Ok(())
}
