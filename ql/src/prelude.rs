use std::fmt::Display;
use std::hash::Hash;

use anyhow::Result;
use image::GrayImage;

/// Data type we use to encode an `Action` to feed the model.
pub type ModelActionType = u8;

/// A single grayscale observation of the game screen
pub type GrayFrame = GrayImage;

pub trait Action: Display + Sized + Clone + Copy + Hash + PartialEq + Eq {
    /// Number of possible actions
    const ACTION_SPACE: ModelActionType;
    /// Identifying the Action as a unique value in range (0..Self::ACTION_SPACE)
    fn numeric(&self) -> ModelActionType;
    fn try_from_numeric(value: ModelActionType) -> Result<Self>;
}

/// Learning environment, modeling the world of a learning agent.
///
/// Implementations own everything needed to drive the game (e.g. a browser session and the
/// detection of the game-over screen) and are treated as a black box by the learner.
pub trait Environment {
    type A: Action;

    /// Resets the environment to a defined starting point
    fn reset(&mut self);

    /// The Action-variant which represents no particular action
    fn no_action() -> Self::A;

    /// Performs one time/action-step.
    ///
    /// Applies the given `action` to the environment and returns:
    ///   - next observation
    ///   - immediate reward earned during performing that step
    ///   - done flag (e.g. game ended)
    ///
    fn step(
        &mut self,
        action: Self::A,
    ) -> (GrayFrame, f32, bool);

    /// Size of the action space
    fn actions(&self) -> ModelActionType { Self::A::ACTION_SPACE }

    /// (width, height) of the produced frames
    fn state_shape(&self) -> (u32, u32);
}
