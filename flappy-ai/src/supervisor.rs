use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use num_format::ToFormattedString;
use ql::prelude::Environment;
use ql::util::format;

use crate::error::HarnessError;
use crate::game_process::{EnvironmentFactory, GameProcess};
use crate::message::{EpisodeResult, Message};
use crate::model_process::ModelProcess;
use crate::progress::ProgressStore;

#[derive(Debug, Clone)]
pub struct SupervisorParameter {
    /// episodes to complete in this run
    pub target_episodes: usize,
    /// maximum number of concurrently running game workers
    pub max_workers: usize,
    /// interval of the progress log line
    pub update_interval: Duration,
    /// pause between two ticks
    pub tick_interval: Duration,
}

impl Default for SupervisorParameter {
    fn default() -> Self {
        Self {
            target_episodes: 10_000,
            max_workers: 1,
            update_interval: Duration::from_secs(5 * 60),
            tick_interval: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub completed_episodes: usize,
    /// episode numbers in spawn order
    pub spawned_episodes: Vec<usize>,
    /// highest episode number handed out so far, including earlier runs
    pub last_episode: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Finished,
}

/// Everything the supervisor loop tracks between two ticks
pub struct SupervisorState<E: Environment> {
    workers: Vec<GameProcess<E>>,
    completed_episodes: usize,
    current_episode: usize,
    spawned_episodes: Vec<usize>,
    results: Vec<EpisodeResult>,
}

impl<E: Environment> SupervisorState<E> {
    /// `last_episode` is the highest episode number of earlier runs
    pub fn new(last_episode: usize) -> Self {
        Self {
            workers: vec![],
            completed_episodes: 0,
            current_episode: last_episode,
            spawned_episodes: vec![],
            results: vec![],
        }
    }

    pub fn active_workers(&self) -> usize { self.workers.len() }

    pub fn completed_episodes(&self) -> usize { self.completed_episodes }

    pub fn current_episode(&self) -> usize { self.current_episode }

    pub fn spawned_episodes(&self) -> &[usize] { &self.spawned_episodes }

    pub fn pending_results(&self) -> &[EpisodeResult] { &self.results }

    pub fn accept(
        &mut self,
        result: EpisodeResult,
    ) {
        self.completed_episodes += 1;
        self.results.push(result);
    }

    /// Removes and joins the workers observed dead.
    /// `observed_alive` holds one liveness sample per worker, in worker order.
    pub fn reap(
        &mut self,
        observed_alive: &[bool],
    ) -> usize {
        debug_assert_eq!(observed_alive.len(), self.workers.len());
        let before = self.workers.len();
        let mut alive = observed_alive.iter().copied();
        self.workers.retain_mut(|worker| {
            if alive.next().unwrap_or(true) {
                true
            } else {
                worker.reap();
                false
            }
        });
        before - self.workers.len()
    }

    /// Hands out the episode numbers for the next batch of workers.
    /// Nothing is handed out while workers are active or once the target is reached.
    pub fn plan_refill(
        &mut self,
        target_episodes: usize,
        max_workers: usize,
    ) -> Vec<usize> {
        if !self.workers.is_empty() {
            return vec![];
        }
        let count = max_workers.min(target_episodes.saturating_sub(self.completed_episodes));
        (0..count)
            .map(|_| {
                self.current_episode += 1;
                self.spawned_episodes.push(self.current_episode);
                self.current_episode
            })
            .collect()
    }

    fn take_results(&mut self) -> Vec<EpisodeResult> { std::mem::take(&mut self.results) }
}

/// Relays prediction requests between the game workers and the model process and runs the
/// drain-and-train cycle whenever all workers have finished.
pub struct Supervisor<E: Environment> {
    param: SupervisorParameter,
    factory: EnvironmentFactory<E>,
    model: ModelProcess,
    store: ProgressStore,
    state: SupervisorState<E>,
    last_update: Instant,
}

impl<E: Environment + 'static> Supervisor<E> {
    /// `model` needs to be started already.
    /// Episode numbering continues after the last episode found in `store`.
    pub fn new(
        param: SupervisorParameter,
        factory: EnvironmentFactory<E>,
        model: ModelProcess,
        store: ProgressStore,
    ) -> Self {
        let last_episode = store.last_episode().unwrap_or(0);
        Self {
            param,
            factory,
            model,
            store,
            state: SupervisorState::new(last_episode),
            last_update: Instant::now(),
        }
    }

    pub fn state(&self) -> &SupervisorState<E> { &self.state }

    pub fn run(mut self) -> Result<RunSummary> {
        let fmt = format::number_format();
        log::info!(
            "training {} episodes with up to {} workers, starting after episode {}",
            self.param.target_episodes.to_formatted_string(&fmt),
            self.param.max_workers,
            self.state.current_episode.to_formatted_string(&fmt)
        );

        while self.tick()? == Tick::Continue {
            thread::sleep(self.param.tick_interval);
        }
        self.model.shutdown();

        let summary = RunSummary {
            completed_episodes: self.state.completed_episodes,
            spawned_episodes: std::mem::take(&mut self.state.spawned_episodes),
            last_episode: self.state.current_episode,
        };
        log::info!(
            "finished: {} episodes completed, last episode: {}",
            summary.completed_episodes.to_formatted_string(&fmt),
            summary.last_episode.to_formatted_string(&fmt)
        );
        Ok(summary)
    }

    /// One round of the loop: relay, reap, and, once no worker is left, drain-and-train and refill.
    pub fn tick(&mut self) -> Result<Tick> {
        if !self.model.is_alive() {
            return Err(HarnessError::ModelProcessDied.into());
        }

        let observed_alive = self.dispatch()?;
        let reaped = self.state.reap(&observed_alive);
        if reaped > 0 {
            log::debug!("reaped {} workers, {} active", reaped, self.state.active_workers());
        }
        self.log_progress();

        if self.state.workers.is_empty() {
            self.drain_and_train()?;
            if self.state.completed_episodes >= self.param.target_episodes {
                return Ok(Tick::Finished);
            }
            self.refill()?;
        }
        Ok(Tick::Continue)
    }

    /// Reads at most one message per worker and handles it.
    /// Returns the liveness of each worker, sampled before its pipe was read.
    fn dispatch(&mut self) -> Result<Vec<bool>> {
        let mut observed_alive = Vec::with_capacity(self.state.workers.len());
        let mut finished = vec![];

        for worker in &self.state.workers {
            observed_alive.push(worker.is_alive());
            let Some(pipe) = worker.parent_pipe() else {
                continue;
            };

            match pipe.poll() {
                Ok(Some(Message::Prediction(request))) => {
                    let reply = self.model.forward(Message::Prediction(request))?;
                    if let Err(e) = pipe.send(reply) {
                        log::warn!("unable to reply to worker of episode {:?}: {}", worker.episode_number(), e);
                    }
                }
                Ok(Some(Message::EpisodeResult(result))) => finished.push(result),
                // the worker ended; it gets reaped
                Ok(None) | Err(_) => {}
            }
        }

        for result in finished {
            log::debug!("received result of episode {} (score: {})", result.episode_number, result.score);
            self.state.accept(result);
        }
        Ok(observed_alive)
    }

    /// Persists the accumulated results and feeds them one by one to the model process
    fn drain_and_train(&mut self) -> Result<()> {
        let results = self.state.take_results();
        if results.is_empty() {
            return Ok(());
        }

        let records: Vec<_> = results.iter().map(EpisodeResult::progress_record).collect();
        let stored = self.store.append(&records)?;
        log::info!(
            "persisted {} episode results ({} in {})",
            records.len(),
            stored.to_formatted_string(&format::number_format()),
            self.store.path().display()
        );

        for result in results {
            self.model.train(result)?;
        }
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        for episode_number in self.state.plan_refill(self.param.target_episodes, self.param.max_workers) {
            let mut worker = GameProcess::new(Arc::clone(&self.factory));
            worker.start(episode_number)?;
            self.state.workers.push(worker);
        }
        Ok(())
    }

    fn log_progress(&mut self) {
        if self.last_update.elapsed() < self.param.update_interval {
            return;
        }
        let fmt = format::number_format();
        log::info!(
            "progress: {} of {} episodes completed, {} workers active",
            self.state.completed_episodes.to_formatted_string(&fmt),
            self.param.target_episodes.to_formatted_string(&fmt),
            self.state.active_workers()
        );
        self.last_update = Instant::now();
    }
}
