use std::path::Path;

use anyhow::Result;

use crate::prelude::{GrayFrame, ModelActionType};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainStats {
    pub loss: f32,
    pub accuracy: f32,
}

/// 'Physical' AI model abstraction
pub trait DeepQLearningModel: Send {
    fn action_space(&self) -> ModelActionType;

    /// Predicts one Q-value per action for the given state
    fn predict(
        &self,
        state: &GrayFrame,
    ) -> Result<Vec<f32>>;

    /// Predicts the best action based on the current state.
    fn predict_action(
        &self,
        state: &GrayFrame,
    ) -> Result<ModelActionType> {
        let q_values = self.predict(state)?;
        Ok(argmax(&q_values))
    }

    /// Highest predicted Q-value for each of the given states
    fn batch_predict_max_future_reward(
        &self,
        states: &[&GrayFrame],
    ) -> Result<Vec<f32>> {
        states
            .iter()
            .map(|&state| {
                self.predict(state)
                    .map(|q_values| q_values.into_iter().fold(f32::NEG_INFINITY, f32::max))
            })
            .collect()
    }

    /// Performs a single training step using a batch of data.
    ///
    /// # Arguments
    /// * `state_batch` states in which the actions were taken
    /// * `action_batch` the taken actions
    /// * `updated_q_values` temporal-difference targets for the Q-value of the taken action
    ///
    /// # Returns
    ///   loss and accuracy of that step
    ///
    fn train(
        &mut self,
        state_batch: &[&GrayFrame],
        action_batch: &[ModelActionType],
        updated_q_values: &[f32],
    ) -> Result<TrainStats>;

    fn write_checkpoint(
        &self,
        file: &Path,
    ) -> Result<()>;

    fn read_checkpoint(
        &mut self,
        file: &Path,
    ) -> Result<()>;
}

/// Index of the highest value; the first one wins on ties
pub fn argmax(values: &[f32]) -> ModelActionType {
    let (index, _) = values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
    index as ModelActionType
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&[0.0, 1.0], 1)]
    #[case(&[-3.0, -11.7], 0)]
    #[case(&[2.0, 2.0, 1.0], 0)]
    #[case(&[0.1, 0.2, 0.3, 0.25], 2)]
    fn test_argmax(
        #[case] values: &[f32],
        #[case] expected: ModelActionType,
    ) {
        assert_eq!(argmax(values), expected);
    }
}
