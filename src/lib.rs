//! criprof
//!
//! Best-effort detection of the container runtime, orchestration scheduler
//! and image format the current process runs under. Results are advisory and
//! must not be used to enforce isolation.

pub mod cli;
pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod probe;
pub mod testing;

pub use engine::{Context, Engine, EngineBuilder, EngineConfig};
pub use error::{DetectError, Error, ProbeError, Result};
pub use output::Inventory;
pub use probe::{Category, Evidence, Probe, ProbeResult};

use std::sync::OnceLock;

use probe::OsFileSystem;

fn default_engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(Engine::default)
}

/// Classify the current process with every built-in probe.
///
/// Results are cached process-wide for five minutes.
pub fn detect() -> Inventory {
    detect_with(&Context::background())
}

/// Like [`detect`], bounded by `ctx`. Cancellation yields
/// [`Inventory::fallback`].
pub fn detect_with(ctx: &Context) -> Inventory {
    default_engine()
        .detect_all(ctx)
        .unwrap_or_else(|_| Inventory::fallback())
}

/// Drop the cached result of [`detect`].
pub fn invalidate_cache() {
    default_engine().invalidate_cache();
}

/// Whether the current process appears to run in a container.
pub fn is_container() -> bool {
    container::is_container_with(&OsFileSystem, default_engine())
}
