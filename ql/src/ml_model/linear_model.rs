use std::path::Path;

use anyhow::Result;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::ml_model::model::{DeepQLearningModel, TrainStats};
use crate::ml_model::ModelError;
use crate::prelude::{GrayFrame, ModelActionType};
use crate::util::fs::{read_json, write_json};

/// Frames get down-sampled to this size (x, y) before they are fed into the model
pub const FEATURE_FRAME_SIZE: (u32, u32) = (20, 15);

/// Share of samples counting as accurate, when the updated Q-value is that close to the target
const ACCURACY_TOLERANCE: f32 = 0.5;

#[derive(Serialize, Deserialize)]
struct LinearQModelCheckpoint {
    feature_frame_size: (u32, u32),
    action_space: ModelActionType,
    weights: Vec<Vec<f32>>,
}

/// Linear Q-value approximation: one weight vector per action over the normalized pixels of the
/// down-sampled frame plus a bias.
pub struct LinearQModel {
    feature_frame_size: (u32, u32),
    action_space: ModelActionType,
    learning_rate: f32,
    /// [action][feature]; the last feature is the bias
    weights: Vec<Vec<f32>>,
}

impl LinearQModel {
    pub fn new(
        action_space: ModelActionType,
        feature_frame_size: (u32, u32),
        learning_rate: f32,
    ) -> Self {
        assert!(action_space > 0);
        assert!(feature_frame_size.0 > 0 && feature_frame_size.1 > 0);
        let num_features = (feature_frame_size.0 * feature_frame_size.1) as usize + 1;
        Self {
            feature_frame_size,
            action_space,
            learning_rate,
            weights: vec![vec![0.0; num_features]; action_space as usize],
        }
    }

    fn features(
        &self,
        state: &GrayFrame,
    ) -> Vec<f32> {
        let (x, y) = self.feature_frame_size;
        let mut features: Vec<f32> = if state.dimensions() == (x, y) {
            state.pixels().map(|p| p.0[0] as f32 / 255.0).collect()
        } else {
            imageops::resize(state, x, y, FilterType::Triangle)
                .pixels()
                .map(|p| p.0[0] as f32 / 255.0)
                .collect()
        };
        features.push(1.0);
        features
    }

    fn q_value(
        &self,
        action: ModelActionType,
        features: &[f32],
    ) -> f32 {
        dot(&self.weights[action as usize], features)
    }
}

fn dot(
    lhs: &[f32],
    rhs: &[f32],
) -> f32 {
    lhs.iter().zip(rhs).map(|(&l, &r)| l * r).sum()
}

impl DeepQLearningModel for LinearQModel {
    fn action_space(&self) -> ModelActionType { self.action_space }

    fn predict(
        &self,
        state: &GrayFrame,
    ) -> Result<Vec<f32>> {
        let features = self.features(state);
        Ok(self.weights.iter().map(|w| dot(w, &features)).collect())
    }

    fn train(
        &mut self,
        state_batch: &[&GrayFrame],
        action_batch: &[ModelActionType],
        updated_q_values: &[f32],
    ) -> Result<TrainStats> {
        if state_batch.len() != action_batch.len() || state_batch.len() != updated_q_values.len() {
            return Err(ModelError::BatchMismatch {
                states: state_batch.len(),
                actions: action_batch.len(),
                targets: updated_q_values.len(),
            }
            .into());
        }
        if let Some(&action) = action_batch.iter().find(|&&a| a >= self.action_space) {
            return Err(ModelError::ActionOutOfRange {
                action,
                action_space: self.action_space,
            }
            .into());
        }
        if state_batch.is_empty() {
            return Ok(TrainStats::default());
        }

        let batch: Vec<(Vec<f32>, ModelActionType, f32)> = state_batch
            .iter()
            .zip(action_batch)
            .zip(updated_q_values)
            .map(|((&state, &action), &target)| (self.features(state), action, target))
            .collect();

        let mut squared_error_sum = 0.0;
        for (features, action, target) in &batch {
            let error = self.q_value(*action, features) - target;
            squared_error_sum += error * error;
            let learning_rate = self.learning_rate;
            for (w, x) in self.weights[*action as usize].iter_mut().zip(features) {
                *w -= learning_rate * error * x;
            }
        }

        let accurate = batch
            .iter()
            .filter(|(features, action, target)| (self.q_value(*action, features) - target).abs() < ACCURACY_TOLERANCE)
            .count();

        Ok(TrainStats {
            loss: squared_error_sum / batch.len() as f32,
            accuracy: accurate as f32 / batch.len() as f32,
        })
    }

    fn write_checkpoint(
        &self,
        file: &Path,
    ) -> Result<()> {
        let checkpoint = LinearQModelCheckpoint {
            feature_frame_size: self.feature_frame_size,
            action_space: self.action_space,
            weights: self.weights.clone(),
        };
        write_json(file, &checkpoint)
    }

    fn read_checkpoint(
        &mut self,
        file: &Path,
    ) -> Result<()> {
        let checkpoint: LinearQModelCheckpoint = read_json(file)?;
        if checkpoint.feature_frame_size != self.feature_frame_size || checkpoint.action_space != self.action_space {
            return Err(ModelError::IncompatibleCheckpoint(format!(
                "checkpoint has frame size {:?} and {} actions, model expects {:?} and {}",
                checkpoint.feature_frame_size, checkpoint.action_space, self.feature_frame_size, self.action_space
            ))
            .into());
        }
        let num_features = self.weights[0].len();
        if checkpoint.weights.len() != self.action_space as usize || checkpoint.weights.iter().any(|w| w.len() != num_features) {
            return Err(ModelError::IncompatibleCheckpoint("unexpected weight dimensions".to_string()).into());
        }
        self.weights = checkpoint.weights;
        Ok(())
    }
}
