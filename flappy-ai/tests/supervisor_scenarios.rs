use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use flappy_ai::environment::scripted::ScriptedEnvironment;
use flappy_ai::error::HarnessError;
use flappy_ai::game_process::EnvironmentFactory;
use flappy_ai::model_process::{ModelProcess, ModelProcessParameter};
use flappy_ai::progress::{ProgressRecord, ProgressStore};
use flappy_ai::supervisor::Supervisor;
use ql::ml_model::checkpoint::{TrainingState, WEIGHTS_FILE};
use ql::ml_model::NetworkType;

mod common;

fn record(
    episode: usize,
    score: f32,
) -> ProgressRecord {
    ProgressRecord { episode, score }
}

#[test]
fn test_single_episode_is_persisted_and_trained() -> Result<()> {
    common::init();
    let dir = tempfile::tempdir()?;

    let summary = common::supervisor(dir.path(), common::quick_param(1, 1), 12)?.run()?;

    assert_eq!(summary.completed_episodes, 1);
    assert_eq!(summary.spawned_episodes, vec![1]);
    assert_eq!(ProgressStore::in_dir(dir.path()).load(), vec![record(1, 10.0)]);

    let state = TrainingState::load(dir.path())?;
    assert_eq!(state.frames_seen, 12);
    assert_eq!(state.loss_history.len(), 1);
    assert!(dir.path().join(WEIGHTS_FILE).exists());
    Ok(())
}

#[test]
fn test_serialized_workers() -> Result<()> {
    common::init();
    let dir = tempfile::tempdir()?;

    let summary = common::supervisor(dir.path(), common::quick_param(3, 1), 12)?.run()?;

    assert_eq!(summary.completed_episodes, 3);
    assert_eq!(summary.spawned_episodes, vec![1, 2, 3]);
    assert_eq!(summary.last_episode, 3);
    assert_eq!(
        ProgressStore::in_dir(dir.path()).load(),
        vec![record(1, 10.0), record(2, 10.0), record(3, 10.0)]
    );
    Ok(())
}

#[test]
fn test_concurrent_workers_deliver_every_result() -> Result<()> {
    common::init();
    let dir = tempfile::tempdir()?;

    let summary = common::supervisor(dir.path(), common::quick_param(4, 4), 15)?.run()?;

    assert_eq!(summary.completed_episodes, 4);
    assert_eq!(summary.spawned_episodes, vec![1, 2, 3, 4]);
    let records = ProgressStore::in_dir(dir.path()).load();
    assert_eq!(records, (1..=4).map(|e| record(e, 13.0)).collect::<Vec<_>>());

    let state = TrainingState::load(dir.path())?;
    assert_eq!(state.frames_seen, 4 * 15);
    assert_eq!(state.loss_history.len(), 4);
    Ok(())
}

#[test]
fn test_short_episodes_are_recorded_but_not_trained() -> Result<()> {
    common::init();
    let dir = tempfile::tempdir()?;

    let summary = common::supervisor(dir.path(), common::quick_param(2, 1), 5)?.run()?;

    assert_eq!(summary.completed_episodes, 2);
    assert_eq!(ProgressStore::in_dir(dir.path()).load(), vec![record(1, 3.0), record(2, 3.0)]);
    assert!(TrainingState::load(dir.path()).is_err());
    Ok(())
}

#[test]
fn test_resumes_episode_numbering() -> Result<()> {
    common::init();
    let dir = tempfile::tempdir()?;
    ProgressStore::in_dir(dir.path()).append(&[record(1, 4.0), record(7, 2.0)])?;

    let summary = common::supervisor(dir.path(), common::quick_param(2, 1), 12)?.run()?;

    assert_eq!(summary.spawned_episodes, vec![8, 9]);
    assert_eq!(summary.last_episode, 9);
    assert_eq!(
        ProgressStore::in_dir(dir.path()).load(),
        vec![record(1, 4.0), record(7, 2.0), record(8, 10.0), record(9, 10.0)]
    );

    let second = common::supervisor(dir.path(), common::quick_param(1, 1), 12)?.run()?;
    assert_eq!(second.spawned_episodes, vec![10]);
    Ok(())
}

#[test]
fn test_model_process_death_aborts_run() -> Result<()> {
    common::init();
    let dir = tempfile::tempdir()?;
    let mut model = ModelProcess::new(ModelProcessParameter {
        save_dir: dir.path().to_path_buf(),
        action_space: 0,
        ..Default::default()
    });
    model.start(NetworkType::Dqn)?;

    let supervisor = Supervisor::new(
        common::quick_param(3, 1),
        common::scripted(12),
        model,
        ProgressStore::in_dir(dir.path()),
    );
    let error = supervisor.run().expect_err("run must fail without model process");
    assert!(matches!(error.downcast_ref::<HarnessError>(), Some(HarnessError::ModelProcessDied)));
    assert!(ProgressStore::in_dir(dir.path()).load().is_empty());
    Ok(())
}

#[test]
fn test_flappy_simulation_run() -> Result<()> {
    use flappy_ai::environment::flappy_simulation::FlappySimulation;

    common::init();
    let dir = tempfile::tempdir()?;

    let supervisor = Supervisor::new(
        common::quick_param(2, 2),
        Arc::new(|| Ok(FlappySimulation::with_seed(7).with_step_limit(40))),
        common::started_model(dir.path(), NetworkType::Random)?,
        ProgressStore::in_dir(dir.path()),
    );
    let summary = supervisor.run()?;

    assert_eq!(summary.completed_episodes, 2);
    let records = ProgressStore::in_dir(dir.path()).load();
    assert_eq!(records.iter().map(|r| r.episode).collect::<Vec<_>>(), vec![1, 2]);
    assert!(records.iter().all(|r| r.score <= 39.0));
    Ok(())
}

/// Runs 3 episodes while the environment of the second worker cannot be built or panics
fn run_with_broken_second_worker(panics: bool) -> Result<()> {
    common::init();
    let dir = tempfile::tempdir()?;
    let calls = AtomicUsize::new(0);
    let factory: EnvironmentFactory<ScriptedEnvironment> = Arc::new(move || {
        if calls.fetch_add(1, Ordering::SeqCst) == 1 {
            if panics {
                panic!("environment crashed");
            }
            return Err(anyhow!("no browser"));
        }
        Ok(ScriptedEnvironment::new(12))
    });

    let supervisor = Supervisor::new(
        common::quick_param(3, 1),
        factory,
        common::started_model(dir.path(), NetworkType::Dqn)?,
        ProgressStore::in_dir(dir.path()),
    );
    let summary = supervisor.run()?;

    assert_eq!(summary.completed_episodes, 3);
    assert_eq!(summary.spawned_episodes, vec![1, 2, 3, 4]);
    assert_eq!(summary.last_episode, 4);
    assert_eq!(
        ProgressStore::in_dir(dir.path()).load(),
        vec![record(1, 10.0), record(3, 10.0), record(4, 10.0)]
    );
    assert_eq!(TrainingState::load(dir.path())?.loss_history.len(), 3);
    Ok(())
}

#[test]
fn test_failed_worker_is_replaced() -> Result<()> { run_with_broken_second_worker(false) }

#[test]
fn test_panicked_worker_is_replaced() -> Result<()> { run_with_broken_second_worker(true) }
