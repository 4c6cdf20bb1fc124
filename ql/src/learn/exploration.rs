use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExplorationParameter {
    /// Epsilon at the beginning
    pub epsilon_start: f64,
    /// Epsilon never decays below this value
    pub epsilon_min: f64,
    /// Number of frames to observe before epsilon starts to decay
    pub observe_frames: usize,
    /// Number of frames over which epsilon decays linearly from `epsilon_start` to `epsilon_min`
    pub explore_frames: usize,
}

impl ExplorationParameter {
    fn epsilon_interval(&self) -> f64 { self.epsilon_start - self.epsilon_min }
}

impl Default for ExplorationParameter {
    fn default() -> Self {
        Self {
            epsilon_start: 1.0,
            epsilon_min: 0.1,
            observe_frames: 10_000,
            explore_frames: 200_000,
        }
    }
}

/// Epsilon-greedy schedule: constant during the observation phase, then linear decay to the floor.
#[derive(Debug, Clone)]
pub struct ExplorationSchedule {
    param: ExplorationParameter,
    frames_seen: usize,
}

impl ExplorationSchedule {
    pub fn new(param: ExplorationParameter) -> Self {
        assert!(param.epsilon_min <= param.epsilon_start);
        assert!(param.explore_frames > 0);
        Self { param, frames_seen: 0 }
    }

    /// Continues a schedule, which already observed `frames_seen` frames
    pub fn resume(
        param: ExplorationParameter,
        frames_seen: usize,
    ) -> Self {
        Self {
            frames_seen,
            ..Self::new(param)
        }
    }

    /// Continues a schedule from a saved epsilon, when the number of observed frames is unknown.
    /// Takes the frame count at which the schedule reaches `epsilon`.
    pub fn resume_at_epsilon(
        param: ExplorationParameter,
        epsilon: f64,
    ) -> Self {
        let frames_seen = if epsilon >= param.epsilon_start || param.epsilon_interval() <= 0.0 {
            0
        } else if epsilon <= param.epsilon_min {
            param.observe_frames + param.explore_frames
        } else {
            let decayed_share = (param.epsilon_start - epsilon) / param.epsilon_interval();
            param.observe_frames + (decayed_share * param.explore_frames as f64).round() as usize
        };
        Self::resume(param, frames_seen)
    }

    pub fn frames_seen(&self) -> usize { self.frames_seen }

    pub fn epsilon(&self) -> f64 {
        if self.frames_seen <= self.param.observe_frames {
            return self.param.epsilon_start;
        }
        let decay_frames = (self.frames_seen - self.param.observe_frames) as f64;
        f64::max(
            self.param.epsilon_start - self.param.epsilon_interval() * decay_frames / self.param.explore_frames as f64,
            self.param.epsilon_min,
        )
    }

    /// Counts one more observed frame and returns the resulting epsilon
    pub fn observe_frame(&mut self) -> f64 {
        self.frames_seen += 1;
        self.epsilon()
    }
}
