use crate::prelude::ModelActionType;

use self::linear_model::{LinearQModel, FEATURE_FRAME_SIZE};
use self::model::DeepQLearningModel;
use self::random_model::RandomModel;

pub mod checkpoint;
pub mod linear_model;
pub mod model;
pub mod random_model;

/// Selects the architecture of the model behind the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// Q-value approximation over the down-sampled screen
    Dqn,
    /// Random q-values, no learning; a baseline
    Random,
}

impl NetworkType {
    pub fn build(
        self,
        action_space: ModelActionType,
        learning_rate: f32,
    ) -> Box<dyn DeepQLearningModel> {
        match self {
            NetworkType::Dqn => Box::new(LinearQModel::new(action_space, FEATURE_FRAME_SIZE, learning_rate)),
            NetworkType::Random => Box::new(RandomModel::new(action_space)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("batch length mismatch: {states} states, {actions} actions, {targets} targets")]
    BatchMismatch { states: usize, actions: usize, targets: usize },

    #[error("action {action} out of range (action space: {action_space})")]
    ActionOutOfRange { action: ModelActionType, action_space: ModelActionType },

    #[error("incompatible checkpoint: {0}")]
    IncompatibleCheckpoint(String),
}
