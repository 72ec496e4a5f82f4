//! Error types for corepool.

use thiserror::Error;

use crate::engine::EngineState;

#[derive(Debug, Error)]
pub enum Error {
    /// Submission after `stop()` was invoked. Never silently dropped.
    #[error("submission rejected: engine is {0}")]
    SubmissionRejected(EngineState),

    #[error("cannot {op} while engine is {state}")]
    InvalidState {
        op: &'static str,
        state: EngineState,
    },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
