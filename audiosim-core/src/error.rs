//! Error types for AudioSim

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioSimError {
    #[error("IRS format error: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Audio loading error: {0}")]
    AudioLoading(String),

    #[error("Audio writing error: {0}")]
    AudioWriting(String),
}

pub type Result<T> = std::result::Result<T, AudioSimError>;
