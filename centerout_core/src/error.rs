use centerout_config::ParamError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("parameter error: {0}")]
    Params(#[from] ParamError),
    #[error("target index {index} out of range for {n_targets} targets")]
    TargetOutOfRange { index: usize, n_targets: usize },
    #[error("target sequence is empty")]
    EmptySequence,
    #[error("malformed event: {0}")]
    Event(String),
    #[error("source error: {0}")]
    Source(String),
    #[error("controller is shut down")]
    Disconnected,
}
