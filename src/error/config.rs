use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    HomeDirUnavailable,

    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_display() {
        let err = ConfigError::file_not_found("/etc/criprof.yaml");
        assert_eq!(err.to_string(), "config file not found: /etc/criprof.yaml");
    }

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::invalid_value("network.timeout_ms", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid config value for network.timeout_ms: must be greater than zero"
        );
    }

    #[test]
    fn test_home_dir_unavailable_display() {
        assert_eq!(
            ConfigError::HomeDirUnavailable.to_string(),
            "could not determine home directory"
        );
    }
}
