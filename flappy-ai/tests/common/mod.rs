use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use flappy_ai::environment::scripted::ScriptedEnvironment;
use flappy_ai::game_process::EnvironmentFactory;
use flappy_ai::model_process::{ModelProcess, ModelProcessParameter};
use flappy_ai::progress::ProgressStore;
use flappy_ai::supervisor::{Supervisor, SupervisorParameter};
use ql::ml_model::NetworkType;

pub fn init() { ql::util::logging::init_test_logging() }

pub fn scripted(episode_steps: usize) -> EnvironmentFactory<ScriptedEnvironment> { Arc::new(move || Ok(ScriptedEnvironment::new(episode_steps))) }

pub fn quick_param(
    target_episodes: usize,
    max_workers: usize,
) -> SupervisorParameter {
    SupervisorParameter {
        target_episodes,
        max_workers,
        tick_interval: Duration::from_micros(100),
        ..Default::default()
    }
}

pub fn started_model(
    save_dir: &Path,
    network_type: NetworkType,
) -> Result<ModelProcess> {
    let mut model = ModelProcess::new(ModelProcessParameter {
        save_dir: save_dir.to_path_buf(),
        ..Default::default()
    });
    model.start(network_type)?;
    Ok(model)
}

pub fn supervisor(
    save_dir: &Path,
    param: SupervisorParameter,
    episode_steps: usize,
) -> Result<Supervisor<ScriptedEnvironment>> {
    Ok(Supervisor::new(
        param,
        scripted(episode_steps),
        started_model(save_dir, NetworkType::Dqn)?,
        ProgressStore::in_dir(save_dir),
    ))
}
