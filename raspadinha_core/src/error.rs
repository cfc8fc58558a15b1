use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("card index {index} out of range for batch of {len}")]
    InvalidIndex { index: usize, len: usize },
    #[error("batch already finished")]
    BatchFinished,
    #[error("card {0} has not been revealed")]
    NotRevealed(usize),
    #[error("batch not finished: {revealed} of {total} cards revealed")]
    NotFinished { revealed: usize, total: usize },
    #[error("stroke of {points} points exceeds the limit of {max}")]
    MaskTooLarge { points: usize, max: usize },
}

impl EngineError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
