#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use criprof::probe::{Accessors, Environment, SystemIdentity};
use criprof::testing::{FixedIdentity, MemoryFileSystem, StaticNetwork};
use criprof::{Engine, Inventory};
use tempfile::TempDir;

pub const CONTAINER_ID: &str = "9d3c5e1f0a2b4c6d8e0f1a3b5c7d9e1f2a4b6c8d0e2f4a6b8c0d2e4f6a8b0c2d";

/// Accessors over in-memory doubles. The identity reads the container id
/// from `fs` like the real one does.
pub fn accessors(fs: MemoryFileSystem, env: Environment, network: StaticNetwork) -> Accessors {
    let fs = Arc::new(fs);
    Accessors {
        identity: Arc::new(SystemIdentity::new(fs.clone())),
        fs,
        network: Arc::new(network),
        env: Arc::new(env),
        network_timeout: Duration::from_millis(200),
    }
}

/// Uncached engine over the full roster.
pub fn engine_for(accessors: &Accessors) -> Engine {
    Engine::builder()
        .without_caching()
        .with_identity(accessors.identity.clone())
        .with_probes(criprof::probe::default_probes(accessors))
        .build()
}

pub fn fixed_identity() -> Arc<FixedIdentity> {
    Arc::new(FixedIdentity::new().with_hostname("fixture-host"))
}

pub fn undetermined(hostname: &str) -> Inventory {
    Inventory {
        hostname: hostname.to_string(),
        ..Inventory::fallback()
    }
}

pub fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("criprof.yaml");
    std::fs::write(&path, content).unwrap();
    path
}
