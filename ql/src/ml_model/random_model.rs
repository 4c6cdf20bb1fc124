use std::path::Path;

use anyhow::{bail, Result};
use rand::Rng;

use crate::ml_model::model::{DeepQLearningModel, TrainStats};
use crate::prelude::{GrayFrame, ModelActionType};

/// Answers with random Q-values and learns nothing
pub struct RandomModel {
    action_space: ModelActionType,
}

impl RandomModel {
    pub fn new(action_space: ModelActionType) -> Self {
        assert!(action_space > 0);
        Self { action_space }
    }
}

impl DeepQLearningModel for RandomModel {
    fn action_space(&self) -> ModelActionType { self.action_space }

    fn predict(
        &self,
        _state: &GrayFrame,
    ) -> Result<Vec<f32>> {
        let mut rng = rand::thread_rng();
        Ok((0..self.action_space).map(|_| rng.gen::<f32>()).collect())
    }

    fn train(
        &mut self,
        _state_batch: &[&GrayFrame],
        _action_batch: &[ModelActionType],
        _updated_q_values: &[f32],
    ) -> Result<TrainStats> {
        Ok(TrainStats::default())
    }

    fn write_checkpoint(
        &self,
        _file: &Path,
    ) -> Result<()> {
        Ok(())
    }

    fn read_checkpoint(
        &mut self,
        _file: &Path,
    ) -> Result<()> {
        bail!("random model has no weights")
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    #[test]
    fn test_nothing_to_restore() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut model = RandomModel::new(3);
        model.write_checkpoint(&dir.path().join("weights.json"))?;
        assert!(model.read_checkpoint(&dir.path().join("weights.json")).is_err());

        let q_values = model.predict(&GrayFrame::from_pixel(4, 4, Luma([0])))?;
        assert_eq!(q_values.len(), 3);
        Ok(())
    }
}
