use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use ql::learn::trajectory::Trajectory;
use ql::prelude::{Action, Environment};

use crate::error::HarnessError;
use crate::message::{EpisodeResult, Message, PredictionRequest, Reply};
use crate::pipe::{duplex, Pipe};

/// Builds the environment inside the worker, e.g. opening a browser session
pub type EnvironmentFactory<E> = Arc<dyn Fn() -> Result<E> + Send + Sync>;

/// Owns one worker, which plays exactly one episode and ends.
pub struct GameProcess<E: Environment> {
    factory: EnvironmentFactory<E>,
    parent_pipe: Option<Pipe<Reply, Message>>,
    handle: Option<JoinHandle<()>>,
    episode_number: Option<usize>,
}

impl<E: Environment + 'static> GameProcess<E> {
    pub fn new(factory: EnvironmentFactory<E>) -> Self {
        Self {
            factory,
            parent_pipe: None,
            handle: None,
            episode_number: None,
        }
    }

    /// Spawns the worker for episode `episode_number` and returns immediately
    pub fn start(
        &mut self,
        episode_number: usize,
    ) -> Result<()> {
        let (parent_pipe, child_pipe) = duplex();
        let factory = Arc::clone(&self.factory);

        let handle = thread::Builder::new()
            .name(format!("game-{}", episode_number))
            .spawn(move || {
                let outcome = factory().and_then(|mut environment| play_episode(&mut environment, &child_pipe, episode_number));
                if let Err(e) = outcome {
                    log::error!("game worker for episode {} failed: {:#}", episode_number, e);
                }
            })?;

        self.parent_pipe = Some(parent_pipe);
        self.handle = Some(handle);
        self.episode_number = Some(episode_number);
        Ok(())
    }
}

impl<E: Environment> GameProcess<E> {
    pub fn parent_pipe(&self) -> Option<&Pipe<Reply, Message>> { self.parent_pipe.as_ref() }

    pub fn episode_number(&self) -> Option<usize> { self.episode_number }

    pub fn is_alive(&self) -> bool { self.handle.as_ref().map_or(false, |h| !h.is_finished()) }

    /// Joins a finished worker. Returns false, if the worker is still running.
    pub fn reap(&mut self) -> bool {
        if self.is_alive() {
            return false;
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("game worker for episode {:?} panicked", self.episode_number);
            }
        }
        true
    }
}

/// Plays one episode on `environment`, asking for every action through `pipe`, and sends the
/// collected trajectory at the end.
pub fn play_episode<E: Environment>(
    environment: &mut E,
    pipe: &Pipe<Message, Reply>,
    episode_number: usize,
) -> Result<()> {
    log::debug!("started episode {}", episode_number);
    environment.reset();

    let mut trajectory = Trajectory::new();
    let (mut state, _, mut done) = environment.step(E::no_action());

    while !done {
        pipe.send(Message::Prediction(PredictionRequest {
            observation: state.clone(),
            no_random: false,
        }))?;
        let action = match pipe.recv()? {
            Reply::Action(action) => E::A::try_from_numeric(action)?,
            other => return Err(HarnessError::UnexpectedReply(format!("{:?}", other)).into()),
        };

        trajectory.record_action(state, action.numeric())?;
        let (next_state, reward, step_done) = environment.step(action);
        trajectory.complete_previous_step(reward, step_done)?;

        state = next_state;
        done = step_done;
    }

    let result = EpisodeResult::new(episode_number, trajectory);
    log::info!("finished episode {}: steps: {}, score: {}", episode_number, result.trajectory.len(), result.score);
    pipe.send(Message::EpisodeResult(result))?;
    Ok(())
}
