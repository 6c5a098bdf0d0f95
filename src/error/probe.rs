use std::path::PathBuf;
use thiserror::Error;

use super::DetectError;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to inspect '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Cancelled(#[from] DetectError),
}

impl ProbeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the cancellation this error carries, if it is one.
    ///
    /// The engine aborts a run on these and absorbs everything else.
    pub fn cancellation(&self) -> Option<DetectError> {
        match self {
            Self::Cancelled(err) => Some(*err),
            Self::Io { .. } => None,
        }
    }
}
