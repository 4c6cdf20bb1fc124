use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use ql::learn::learner::{EpisodeLearner, LearnParameter};
use ql::ml_model::NetworkType;
use ql::prelude::{Action, ModelActionType};

use crate::environment::FlappyAction;
use crate::error::HarnessError;
use crate::message::{EpisodeResult, Message, PredictionRequest, Reply};
use crate::pipe::{duplex, Pipe};

#[derive(Debug, Clone)]
pub struct ModelProcessParameter {
    /// model weights and learner state live here
    pub save_dir: PathBuf,
    pub action_space: ModelActionType,
    pub learn: LearnParameter,
    /// load the saved state at start and save it after each training step
    pub persist: bool,
}

impl Default for ModelProcessParameter {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("save"),
            action_space: FlappyAction::ACTION_SPACE,
            learn: LearnParameter::default(),
            persist: true,
        }
    }
}

/// Owns the single worker holding the model.
///
/// The worker handles one message at a time: it answers prediction requests with an action and
/// episode results with [Reply::Trained] after one training step.
pub struct ModelProcess {
    param: ModelProcessParameter,
    parent_pipe: Option<Pipe<Message, Reply>>,
    handle: Option<JoinHandle<()>>,
}

impl ModelProcess {
    pub fn new(param: ModelProcessParameter) -> Self {
        Self {
            param,
            parent_pipe: None,
            handle: None,
        }
    }

    /// Spawns the worker, which initializes the selected network and loads any saved state
    pub fn start(
        &mut self,
        network_type: NetworkType,
    ) -> Result<()> {
        let (parent_pipe, child_pipe) = duplex();
        let param = self.param.clone();

        let handle = thread::Builder::new().name("model".to_string()).spawn(move || {
            if let Err(e) = serve(&child_pipe, network_type, &param) {
                log::error!("model process failed: {:#}", e);
            }
        })?;

        self.parent_pipe = Some(parent_pipe);
        self.handle = Some(handle);
        Ok(())
    }

    pub fn parent_pipe(&self) -> Option<&Pipe<Message, Reply>> { self.parent_pipe.as_ref() }

    pub fn is_alive(&self) -> bool { self.handle.as_ref().map_or(false, |h| !h.is_finished()) }

    /// Sends `message` and waits for the answer.
    /// The worker only closes its side when it ends, so a closed pipe means it died.
    pub fn forward(
        &self,
        message: Message,
    ) -> Result<Reply, HarnessError> {
        let pipe = self.parent_pipe.as_ref().ok_or(HarnessError::ModelProcessDied)?;
        pipe.send(message)
            .and_then(|_| pipe.recv())
            .map_err(|_| HarnessError::ModelProcessDied)
    }

    pub fn predict(
        &self,
        request: PredictionRequest,
    ) -> Result<ModelActionType, HarnessError> {
        match self.forward(Message::Prediction(request))? {
            Reply::Action(action) => Ok(action),
            other => Err(HarnessError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    /// Hands over an episode for training and waits until it is consumed
    pub fn train(
        &self,
        result: EpisodeResult,
    ) -> Result<(), HarnessError> {
        match self.forward(Message::EpisodeResult(result))? {
            Reply::Trained => Ok(()),
            other => Err(HarnessError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    /// Closes the pipe, which ends the worker, and waits for it
    pub fn shutdown(&mut self) {
        self.parent_pipe = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("model process panicked");
            }
        }
    }
}

impl Drop for ModelProcess {
    fn drop(&mut self) { self.shutdown() }
}

fn serve(
    pipe: &Pipe<Reply, Message>,
    network_type: NetworkType,
    param: &ModelProcessParameter,
) -> Result<()> {
    let model = network_type.build(param.action_space, param.learn.learning_rate);
    let mut learner = EpisodeLearner::new(model, param.learn.clone());
    if param.persist {
        learner.load(&param.save_dir);
    }
    log::info!("model process ready: {:?}, 𝜀={:.3}", network_type, learner.epsilon());

    // ends when the supervisor closes its side
    while let Ok(message) = pipe.recv() {
        match message {
            Message::Prediction(request) => {
                let action = learner.act(&request.observation, request.no_random)?;
                pipe.send(Reply::Action(action))?;
            }
            Message::EpisodeResult(result) => {
                log::debug!("training with episode {} (score: {})", result.episode_number, result.score);
                let trained = learner.learn_episode(&result.trajectory)?.is_some();
                if trained && param.persist {
                    if let Err(e) = learner.save(&param.save_dir) {
                        log::warn!("unable to save model state: {:#}", e);
                    }
                }
                pipe.send(Reply::Trained)?;
            }
        }
    }

    log::debug!("model process shutting down after {} trained episodes", learner.trained_episodes());
    Ok(())
}
