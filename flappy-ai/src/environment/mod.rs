use std::fmt::{Display, Formatter};

use anyhow::{anyhow, Result};
use ql::prelude::{Action, ModelActionType};

pub mod flappy_simulation;
pub mod scripted;

/// The two inputs flappy bird knows
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum FlappyAction {
    Idle,
    Flap,
}

impl Action for FlappyAction {
    const ACTION_SPACE: ModelActionType = 2;

    fn numeric(&self) -> ModelActionType {
        match self {
            FlappyAction::Idle => 0,
            FlappyAction::Flap => 1,
        }
    }

    fn try_from_numeric(value: ModelActionType) -> Result<Self> {
        match value {
            0 => Ok(FlappyAction::Idle),
            1 => Ok(FlappyAction::Flap),
            _ => Err(anyhow!("value {} out of range", value)),
        }
    }
}

impl Display for FlappyAction {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
