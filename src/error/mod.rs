mod config;
mod detect;
mod probe;

pub use config::ConfigError;
pub use detect::DetectError;
pub use probe::ProbeError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
