use anyhow::{bail, Result};

use crate::prelude::{GrayFrame, ModelActionType};

/// One step of an episode.
///
/// Reward, terminal flag and next state are only known after the environment reacted on the
/// action (and the next action was taken), so they are filled in later by [Trajectory].
#[derive(Debug, Clone)]
pub struct MemoryItem {
    state: GrayFrame,
    action: ModelActionType,
    reward: f32,
    next_state: Option<GrayFrame>,
    is_terminal: bool,
    completed: bool,
}

impl MemoryItem {
    pub fn state(&self) -> &GrayFrame { &self.state }

    pub fn action(&self) -> ModelActionType { self.action }

    pub fn reward(&self) -> f32 { self.reward }

    pub fn next_state(&self) -> Option<&GrayFrame> { self.next_state.as_ref() }

    pub fn is_terminal(&self) -> bool { self.is_terminal }

    pub fn is_completed(&self) -> bool { self.completed }

    /// A step is usable for training once its outcome is known and it either ended the episode
    /// or its successor state has been recorded.
    pub fn is_trainable(&self) -> bool { self.completed && (self.is_terminal || self.next_state.is_some()) }
}

/// Append-only log of the steps of one episode.
///
/// Appending a step with [Self::record_action] also stores its state as `next_state` of the
/// preceding step. [Self::complete_previous_step] applies the outcome (reward, terminal flag) of
/// the most recently recorded action. Completed steps are never modified again.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    items: Vec<MemoryItem>,
    score: f32,
}

impl Trajectory {
    pub fn new() -> Self { Self::default() }

    /// Records that `action` was chosen in `state`
    pub fn record_action(
        &mut self,
        state: GrayFrame,
        action: ModelActionType,
    ) -> Result<()> {
        if let Some(previous) = self.items.last_mut() {
            if !previous.completed {
                bail!("previous step has not been completed yet");
            }
            if previous.is_terminal {
                bail!("episode already ended with a terminal step");
            }
            previous.next_state = Some(state.clone());
        }
        self.items.push(MemoryItem {
            state,
            action,
            reward: 0.0,
            next_state: None,
            is_terminal: false,
            completed: false,
        });
        Ok(())
    }

    /// Applies the observed outcome to the most recently recorded step
    pub fn complete_previous_step(
        &mut self,
        reward: f32,
        is_terminal: bool,
    ) -> Result<()> {
        let step_count = self.items.len();
        let Some(item) = self.items.last_mut() else {
            bail!("no recorded step to complete");
        };
        if item.completed {
            bail!("step {} is already completed", step_count - 1);
        }
        item.reward = reward;
        item.is_terminal = is_terminal;
        item.completed = true;
        self.score += reward;
        Ok(())
    }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Cumulative reward of all completed steps
    pub fn score(&self) -> f32 { self.score }

    pub fn items(&self) -> &[MemoryItem] { &self.items }

    pub fn is_finished(&self) -> bool { self.items.last().map_or(false, |e| e.is_terminal) }
}
