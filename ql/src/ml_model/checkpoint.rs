use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::util::fs::{read_json, write_json};

pub const WEIGHTS_FILE: &str = "model_weights.json";
pub const TRAINING_STATE_FILE: &str = "data.json";

/// Learner state kept next to the model weights
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub epsilon: f64,
    #[serde(default)]
    pub frames_seen: usize,
    #[serde(default)]
    pub loss_history: Vec<f32>,
    #[serde(default)]
    pub acc_history: Vec<f32>,
}

impl TrainingState {
    pub fn load(dir: &Path) -> Result<Self> { read_json(&dir.join(TRAINING_STATE_FILE)) }

    pub fn save(
        &self,
        dir: &Path,
    ) -> Result<()> {
        write_json(&dir.join(TRAINING_STATE_FILE), self)
    }
}
