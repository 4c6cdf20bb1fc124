use image::Luma;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ql::prelude::{Environment, GrayFrame};

use crate::environment::FlappyAction;

const FRAME_SIZE_X: u32 = 160;
const FRAME_SIZE_Y: u32 = 120;

const GRAVITY: f32 = 0.35;
const FLAP_VELOCITY: f32 = -3.2;
const MAX_FALL_VELOCITY: f32 = 4.0;

const BIRD_X: f32 = 32.0;
const BIRD_SIZE: f32 = 4.0;

const PIPE_WIDTH: f32 = 12.0;
const PIPE_GAP: f32 = 36.0;
const PIPE_SPACING: f32 = 64.0;
const SCROLL_SPEED: f32 = 2.0;

const BACKGROUND: Luma<u8> = Luma([0]);
const PIPE_COLOR: Luma<u8> = Luma([255]);
const BIRD_COLOR: Luma<u8> = Luma([160]);

#[derive(Debug, Clone)]
struct Pipe {
    x: f32,
    gap_center: f32,
}

/// Flappy bird without a browser: the bird falls, a flap pushes it up and pipes scroll in from
/// the right. Every surviving step earns +1, hitting a pipe, the ground or the ceiling ends the
/// episode with -1.
pub struct FlappySimulation {
    rng: StdRng,
    bird_y: f32,
    velocity: f32,
    pipes: Vec<Pipe>,
    steps: usize,
    step_limit: usize,
    game_over: bool,
}

impl FlappySimulation {
    pub fn new() -> Self { Self::with_rng(StdRng::from_entropy()) }

    /// Reproducible pipe layout
    pub fn with_seed(seed: u64) -> Self { Self::with_rng(StdRng::seed_from_u64(seed)) }

    fn with_rng(rng: StdRng) -> Self {
        let mut simulation = Self {
            rng,
            bird_y: 0.0,
            velocity: 0.0,
            pipes: vec![],
            steps: 0,
            step_limit: 10_000,
            game_over: false,
        };
        simulation.reset();
        simulation
    }

    /// Ends an episode after `step_limit` steps, even if the bird is still flying
    pub fn with_step_limit(
        mut self,
        step_limit: usize,
    ) -> Self {
        self.step_limit = step_limit;
        self
    }

    fn new_pipe(&mut self, x: f32) -> Pipe {
        let margin = PIPE_GAP / 2.0 + 6.0;
        Pipe {
            x,
            gap_center: self.rng.gen_range(margin..FRAME_SIZE_Y as f32 - margin),
        }
    }

    fn advance(
        &mut self,
        action: FlappyAction,
    ) {
        if action == FlappyAction::Flap {
            self.velocity = FLAP_VELOCITY;
        }
        self.velocity = f32::min(self.velocity + GRAVITY, MAX_FALL_VELOCITY);
        self.bird_y += self.velocity;

        for pipe in &mut self.pipes {
            pipe.x -= SCROLL_SPEED;
        }
        self.pipes.retain(|p| p.x + PIPE_WIDTH >= 0.0);
        let spawn_needed = self.pipes.last().map_or(true, |p| p.x <= FRAME_SIZE_X as f32 - PIPE_SPACING);
        if spawn_needed {
            let pipe = self.new_pipe(FRAME_SIZE_X as f32);
            self.pipes.push(pipe);
        }
        self.steps += 1;
    }

    fn crashed(&self) -> bool {
        if self.bird_y < 0.0 || self.bird_y + BIRD_SIZE > FRAME_SIZE_Y as f32 {
            return true;
        }
        self.pipes.iter().any(|p| {
            let overlaps_x = BIRD_X + BIRD_SIZE > p.x && BIRD_X < p.x + PIPE_WIDTH;
            let outside_gap = self.bird_y < p.gap_center - PIPE_GAP / 2.0 || self.bird_y + BIRD_SIZE > p.gap_center + PIPE_GAP / 2.0;
            overlaps_x && outside_gap
        })
    }

    fn render(&self) -> GrayFrame {
        let mut frame = GrayFrame::from_pixel(FRAME_SIZE_X, FRAME_SIZE_Y, BACKGROUND);
        for pipe in &self.pipes {
            let x_range = pixel_range(pipe.x, pipe.x + PIPE_WIDTH, FRAME_SIZE_X);
            let gap_range = pixel_range(pipe.gap_center - PIPE_GAP / 2.0, pipe.gap_center + PIPE_GAP / 2.0, FRAME_SIZE_Y);
            for x in x_range {
                for y in (0..FRAME_SIZE_Y).filter(|y| !gap_range.contains(y)) {
                    frame.put_pixel(x, y, PIPE_COLOR);
                }
            }
        }
        for x in pixel_range(BIRD_X, BIRD_X + BIRD_SIZE, FRAME_SIZE_X) {
            for y in pixel_range(self.bird_y, self.bird_y + BIRD_SIZE, FRAME_SIZE_Y) {
                frame.put_pixel(x, y, BIRD_COLOR);
            }
        }
        frame
    }
}

impl Default for FlappySimulation {
    fn default() -> Self { Self::new() }
}

/// pixels covered by [from, to), clipped to 0..limit
fn pixel_range(
    from: f32,
    to: f32,
    limit: u32,
) -> std::ops::Range<u32> {
    let clip = |v: f32| v.clamp(0.0, limit as f32) as u32;
    clip(from.floor())..clip(to.ceil())
}

impl Environment for FlappySimulation {
    type A = FlappyAction;

    fn reset(&mut self) {
        self.bird_y = FRAME_SIZE_Y as f32 / 2.0;
        self.velocity = 0.0;
        self.pipes = vec![];
        let first_pipe = self.new_pipe(FRAME_SIZE_X as f32 + 20.0);
        self.pipes.push(first_pipe);
        self.steps = 0;
        self.game_over = false;
    }

    fn no_action() -> Self::A { FlappyAction::Idle }

    fn step(
        &mut self,
        action: Self::A,
    ) -> (GrayFrame, f32, bool) {
        if self.game_over {
            return (self.render(), -1.0, true);
        }
        self.advance(action);

        if self.crashed() {
            self.game_over = true;
            log::trace!("bird crashed after {} steps", self.steps);
            (self.render(), -1.0, true)
        } else if self.steps >= self.step_limit {
            self.game_over = true;
            (self.render(), 1.0, true)
        } else {
            (self.render(), 1.0, false)
        }
    }

    fn state_shape(&self) -> (u32, u32) { (FRAME_SIZE_X, FRAME_SIZE_Y) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_bird_falls_to_the_ground() {
        let mut env = FlappySimulation::with_seed(1);
        env.reset();
        let mut steps = 0;
        let reward = loop {
            let (_, reward, done) = env.step(FlappyAction::Idle);
            steps += 1;
            if done {
                break reward;
            }
            assert_eq!(reward, 1.0);
            assert!(steps < 100);
        };
        assert_eq!(reward, -1.0);
        assert!(env.step(FlappyAction::Flap).2, "game over is sticky");
    }

    #[test]
    fn test_frame_shape_and_content() {
        let mut env = FlappySimulation::with_seed(2);
        let (frame, _, _) = env.step(FlappyAction::Idle);
        assert_eq!(frame.dimensions(), env.state_shape());
        assert!(frame.pixels().any(|p| *p == BIRD_COLOR));
    }

    #[test]
    fn test_same_seed_same_game() {
        let mut a = FlappySimulation::with_seed(7);
        let mut b = FlappySimulation::with_seed(7);
        for i in 0..40 {
            let action = if i % 6 == 0 { FlappyAction::Flap } else { FlappyAction::Idle };
            let (frame_a, reward_a, done_a) = a.step(action);
            let (frame_b, reward_b, done_b) = b.step(action);
            assert_eq!(frame_a, frame_b);
            assert_eq!((reward_a, done_a), (reward_b, done_b));
        }
    }

    #[test]
    fn test_step_limit() {
        let mut env = FlappySimulation::with_seed(3).with_step_limit(2);
        assert_eq!(env.step(FlappyAction::Idle), (env.render(), 1.0, false));
        let (_, reward, done) = env.step(FlappyAction::Idle);
        assert_eq!((reward, done), (1.0, true));
    }

    #[test]
    fn test_pixel_range() {
        assert_eq!(pixel_range(-5.0, 3.0, 10), 0..3);
        assert_eq!(pixel_range(8.5, 14.0, 10), 8..10);
    }
}
