use ql::learn::trajectory::Trajectory;
use ql::prelude::{GrayFrame, ModelActionType};

use crate::progress::ProgressRecord;

/// A worker asks for the action to take on `observation`
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub observation: GrayFrame,
    /// suppresses the random actions of the exploration phase
    pub no_random: bool,
}

/// Everything a worker collected during one episode
#[derive(Debug, Clone)]
pub struct EpisodeResult {
    pub episode_number: usize,
    pub score: f32,
    pub trajectory: Trajectory,
}

impl EpisodeResult {
    pub fn new(
        episode_number: usize,
        trajectory: Trajectory,
    ) -> Self {
        Self {
            episode_number,
            score: trajectory.score(),
            trajectory,
        }
    }

    pub fn progress_record(&self) -> ProgressRecord {
        ProgressRecord {
            episode: self.episode_number,
            score: self.score,
        }
    }
}

/// Messages sent by game workers, forwarded as they are to the model process
#[derive(Debug, Clone)]
pub enum Message {
    Prediction(PredictionRequest),
    EpisodeResult(EpisodeResult),
}

/// Answers of the model process, relayed to the workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Action(ModelActionType),
    /// an episode result has been consumed
    Trained,
}
