use std::path::Path;

use anyhow::Result;
use itertools::Itertools;
use num_format::ToFormattedString;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use crate::learn::exploration::{ExplorationParameter, ExplorationSchedule};
use crate::learn::q_target::{updated_q_values, GAMMA};
use crate::learn::trajectory::{MemoryItem, Trajectory};
use crate::ml_model::checkpoint::{TrainingState, WEIGHTS_FILE};
use crate::ml_model::model::{DeepQLearningModel, TrainStats};
use crate::prelude::{GrayFrame, ModelActionType};
use crate::util::format;

#[derive(Debug, Clone)]
pub struct LearnParameter {
    /// Discount rate; (0 <= 𝛾 <= 1) represents the value of future rewards. The bigger, the more farsighted the agent becomes
    pub gamma: f32,
    pub learning_rate: f32,
    /// Episodes with no more than that number of steps are not used for training
    pub min_episode_steps: usize,
    pub exploration: ExplorationParameter,
}

impl Default for LearnParameter {
    fn default() -> Self {
        Self {
            gamma: GAMMA,
            learning_rate: 0.001,
            min_episode_steps: 10,
            exploration: ExplorationParameter::default(),
        }
    }
}

/// Chooses actions epsilon-greedy and trains the model with complete episodes.
pub struct EpisodeLearner {
    param: LearnParameter,
    model: Box<dyn DeepQLearningModel>,
    schedule: ExplorationSchedule,
    rng: StdRng,
    loss_history: Vec<f32>,
    acc_history: Vec<f32>,
    /// actions chosen since the last training step
    action_counts: FxHashMap<ModelActionType, usize>,
    trained_episodes: usize,
}

impl EpisodeLearner {
    pub fn new(
        model: Box<dyn DeepQLearningModel>,
        param: LearnParameter,
    ) -> Self {
        let schedule = ExplorationSchedule::new(param.exploration);
        Self {
            param,
            model,
            schedule,
            rng: StdRng::from_entropy(),
            loss_history: vec![],
            acc_history: vec![],
            action_counts: FxHashMap::default(),
            trained_episodes: 0,
        }
    }

    pub fn epsilon(&self) -> f64 { self.schedule.epsilon() }

    pub fn frames_seen(&self) -> usize { self.schedule.frames_seen() }

    pub fn loss_history(&self) -> &[f32] { &self.loss_history }

    pub fn acc_history(&self) -> &[f32] { &self.acc_history }

    pub fn trained_episodes(&self) -> usize { self.trained_episodes }

    /// Chooses the action for `state`.
    ///
    /// Unless `no_random` is set, the frame counts as observed for the exploration schedule and
    /// a random action is taken with probability epsilon.
    pub fn act(
        &mut self,
        state: &GrayFrame,
        no_random: bool,
    ) -> Result<ModelActionType> {
        let random_action = !no_random && {
            let epsilon = self.schedule.observe_frame();
            self.rng.gen::<f64>() <= epsilon
        };

        let action = if random_action {
            self.rng.gen_range(0..self.model.action_space())
        } else {
            self.model.predict_action(state)?
        };
        *self.action_counts.entry(action).or_default() += 1;

        log::trace!("act: using_random_action: {}, chosen_action: {}", random_action, action);
        Ok(action)
    }

    /// Runs one training step with all steps of the episode.
    ///
    /// Returns `None`, when the episode was too short to be used.
    pub fn learn_episode(
        &mut self,
        trajectory: &Trajectory,
    ) -> Result<Option<TrainStats>> {
        if trajectory.len() <= self.param.min_episode_steps {
            log::debug!("tossing out short episode with {} steps", trajectory.len());
            return Ok(None);
        }

        let samples: Vec<&MemoryItem> = trajectory.items().iter().filter(|e| e.is_trainable()).collect();
        if samples.is_empty() {
            return Ok(None);
        }

        // The Q values of terminal states are 0 by definition, so only the others get predicted
        let next_states: Vec<&GrayFrame> = samples.iter().filter(|e| !e.is_terminal()).filter_map(|e| e.next_state()).collect();
        let mut predicted = self.model.batch_predict_max_future_reward(&next_states)?.into_iter();
        let max_future_rewards: Vec<f32> = samples
            .iter()
            .map(|e| match (e.is_terminal(), e.next_state()) {
                (false, Some(_)) => predicted.next().unwrap_or(0.0),
                _ => 0.0,
            })
            .collect();

        let state_batch: Vec<&GrayFrame> = samples.iter().map(|e| e.state()).collect();
        let action_batch: Vec<ModelActionType> = samples.iter().map(|e| e.action()).collect();
        let rewards: Vec<f32> = samples.iter().map(|e| e.reward()).collect();
        let done: Vec<bool> = samples.iter().map(|e| e.is_terminal()).collect();

        let targets = updated_q_values(&rewards, &max_future_rewards, &done, self.param.gamma);
        let stats = self.model.train(&state_batch, &action_batch, &targets)?;

        self.loss_history.push(stats.loss);
        self.acc_history.push(stats.accuracy);
        self.trained_episodes += 1;
        self.learning_update_log(&stats, samples.len());
        self.action_counts.clear();

        Ok(Some(stats))
    }

    /// Writes model weights and learner state into `dir`
    pub fn save(
        &self,
        dir: &Path,
    ) -> Result<()> {
        self.model.write_checkpoint(&dir.join(WEIGHTS_FILE))?;
        TrainingState {
            epsilon: self.schedule.epsilon(),
            frames_seen: self.schedule.frames_seen(),
            loss_history: self.loss_history.clone(),
            acc_history: self.acc_history.clone(),
        }
        .save(dir)
    }

    /// Restores model weights and learner state from `dir`.
    /// Anything missing or unreadable is reported and the defaults are kept.
    pub fn load(
        &mut self,
        dir: &Path,
    ) {
        match self.model.read_checkpoint(&dir.join(WEIGHTS_FILE)) {
            Ok(()) => log::info!("loaded model weights from {}", dir.display()),
            Err(e) => log::warn!("Unable to load saved weights: {:#}", e),
        }

        match TrainingState::load(dir) {
            Ok(state) => {
                // records without a frame count still carry the reached epsilon
                self.schedule = if state.frames_seen == 0 && state.epsilon < self.param.exploration.epsilon_start {
                    ExplorationSchedule::resume_at_epsilon(self.param.exploration, state.epsilon)
                } else {
                    ExplorationSchedule::resume(self.param.exploration, state.frames_seen)
                };
                self.loss_history = state.loss_history;
                self.acc_history = state.acc_history;
                log::info!(
                    "resumed learner state: frames_seen: {}, 𝜀={:.3}",
                    self.frames_seen().to_formatted_string(&format::number_format()),
                    self.epsilon()
                );
            }
            Err(e) => log::warn!("Unable to load saved memory: {:#}", e),
        }
    }

    fn learning_update_log(
        &self,
        stats: &TrainStats,
        num_samples: usize,
    ) {
        let number_format = format::number_format();
        let total_actions: usize = self.action_counts.values().sum();
        let action_distribution_line = self
            .action_counts
            .iter()
            .sorted_by_key(|(action, _)| **action)
            .map(|(&action, &count)| {
                let ratio = 100.0 * count as f32 / total_actions as f32;
                format!("{} {:.1}%", action, ratio)
            })
            .join(", ");

        log::info!(
            "trained episode {} ({} samples): loss: {:.4}, acc: {:.2}, 𝛾={:.2}, 𝜀={:.3}, frames_seen: {}, action_distribution: {}",
            self.trained_episodes.to_formatted_string(&number_format),
            num_samples,
            stats.loss,
            stats.accuracy,
            self.param.gamma,
            self.epsilon(),
            self.frames_seen().to_formatted_string(&number_format),
            action_distribution_line
        );
    }
}
