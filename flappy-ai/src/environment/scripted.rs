use image::Luma;
use ql::prelude::{Environment, GrayFrame};

use crate::environment::FlappyAction;

/// Plays episodes of a fixed length, regardless of the chosen actions.
///
/// The first step after `reset` delivers the initial observation. Each following step earns +1,
/// the last one ends the episode with -1.
pub struct ScriptedEnvironment {
    episode_steps: usize,
    steps_taken: usize,
    observed: bool,
}

impl ScriptedEnvironment {
    pub const FRAME_SIZE: (u32, u32) = (32, 24);

    pub fn new(episode_steps: usize) -> Self {
        Self {
            episode_steps,
            steps_taken: 0,
            observed: false,
        }
    }

    fn frame(&self) -> GrayFrame {
        let (x, y) = Self::FRAME_SIZE;
        GrayFrame::from_pixel(x, y, Luma([(self.steps_taken * 8 % 256) as u8]))
    }
}

impl Environment for ScriptedEnvironment {
    type A = FlappyAction;

    fn reset(&mut self) {
        self.steps_taken = 0;
        self.observed = false;
    }

    fn no_action() -> Self::A { FlappyAction::Idle }

    fn step(
        &mut self,
        _action: Self::A,
    ) -> (GrayFrame, f32, bool) {
        if !self.observed {
            self.observed = true;
            return (self.frame(), 0.0, self.episode_steps == 0);
        }
        self.steps_taken += 1;
        let done = self.steps_taken >= self.episode_steps;
        (self.frame(), if done { -1.0 } else { 1.0 }, done)
    }

    fn state_shape(&self) -> (u32, u32) { Self::FRAME_SIZE }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_length() {
        let mut env = ScriptedEnvironment::new(3);
        env.reset();
        assert_eq!(env.step(FlappyAction::Idle).1, 0.0);
        let rewards: Vec<(f32, bool)> = (0..3).map(|_| env.step(FlappyAction::Flap)).map(|(_, r, d)| (r, d)).collect();
        assert_eq!(rewards, vec![(1.0, false), (1.0, false), (-1.0, true)]);
        assert_eq!(env.actions(), 2);
        assert_eq!(env.state_shape(), (32, 24));
    }
}
