use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Engine(#[from] ramble_engine::EngineError),
}

impl SdkError {
    /// The engine error behind this one, if any.
    pub fn engine(&self) -> Option<&ramble_engine::EngineError> {
        match self {
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
