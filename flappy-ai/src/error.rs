#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("model process died")]
    ModelProcessDied,

    #[error("pipe closed: {0}")]
    PipeClosed(&'static str),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}
