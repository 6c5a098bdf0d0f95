//! YAML configuration for the `criprof` binary.
//!
//! Looked up at `--config <FILE>` or `$HOME/.criprof.yaml`. Every key is
//! optional; a missing default file means defaults throughout.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::engine::{Engine, DEFAULT_CACHE_TTL};
use crate::error::ConfigError;
use crate::probe::network::DEFAULT_NETWORK_TIMEOUT;
use crate::probe::{default_probes, fast_probes, Accessors, Probe};

pub const DEFAULT_CONFIG_FILE: &str = ".criprof.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// When false only the fast roster runs.
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: DEFAULT_NETWORK_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub network: NetworkConfig,

    /// Overall budget for one detection.
    pub deadline_ms: Option<u64>,

    pub disabled_probes: Vec<String>,
}

impl Config {
    /// Load from `explicit`, or from the default location under the home
    /// directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::file_not_found(path));
            }
            return Self::load_from(path);
        }

        let path = default_config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty document deserializes as null rather than an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::parse_error(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "network.timeout_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// The probes this config selects. `fast` drops network probes even when
    /// the config allows them.
    pub fn probes(&self, accessors: &Accessors, fast: bool) -> Vec<Box<dyn Probe>> {
        let accessors = accessors.clone().with_network_timeout(self.network_timeout());
        let probes = if fast || !self.network.enabled {
            fast_probes(&accessors)
        } else {
            default_probes(&accessors)
        };

        if self.disabled_probes.is_empty() {
            return probes;
        }

        let known: HashSet<&str> = default_probes(&accessors)
            .iter()
            .map(|probe| probe.name())
            .collect();
        for name in &self.disabled_probes {
            if !known.contains(name.as_str()) {
                warn!(probe = %name, "ignoring unknown probe in disabled_probes");
            }
        }

        probes
            .into_iter()
            .filter(|probe| !self.disabled_probes.iter().any(|name| name == probe.name()))
            .collect()
    }

    pub fn engine(&self, accessors: &Accessors, fast: bool) -> Engine {
        let builder = Engine::builder()
            .with_identity(accessors.identity.clone())
            .with_probes(self.probes(accessors, fast));

        if self.cache.enabled {
            builder.with_caching(self.cache_ttl()).build()
        } else {
            builder.without_caching().build()
        }
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
    Ok(home.join(DEFAULT_CONFIG_FILE))
}
