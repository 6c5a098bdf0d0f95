//! Probes: independent detection strategies that each contribute at most one
//! piece of [`Evidence`] per run.
//!
//! Priorities follow a rough cost scale. Compile-time and single-stat checks
//! sit at 90-100, environment lookups at 80-85, and network reachability at
//! 10-20 so they only run once everything cheap has had its say.

pub mod accessors;
pub mod environment;
pub mod image;
pub mod network;
pub mod roster;
pub mod runtime;
pub mod scheduler;

pub use accessors::{
    FileSystem, HostIdentity, HttpResponse, Network, OsFileSystem, OsNetwork, SystemIdentity,
};
pub use environment::Environment;
pub use image::{
    AciEnvProbe, CriImageProbe, DockerImageProbe, OciImageProbe, SingularityImageProbe,
};
pub use network::{KubernetesApiProbe, SwarmPortProbe};
pub use roster::{default_probes, fast_probes, Accessors};
pub use runtime::{
    ContainerdFileProbe, CrioProbe, DockerCgroupProbe, DockerFileProbe, FirecrackerProbe,
    GVisorProbe, KataProbe, LxdSocketProbe, OpenVzProbe, PodmanProbe, RktEnvProbe,
    SingularityProbe, SysboxProbe, WasmProbe,
};
pub use scheduler::{
    AzureContainerInstancesProbe, CloudRunProbe, EcsProbe, FargateProbe, KubernetesEnvProbe,
    KubernetesServiceAccountProbe, LambdaProbe, MesosCgroupProbe, MesosEnvProbe,
    NomadEnvProbe, NomadHostnameProbe,
};

use std::fmt;
use std::path::Path;

use crate::engine::Context;
use crate::error::ProbeError;

/// Sentinel for a category no probe produced evidence for.
pub const UNDETERMINED: &str = "undetermined";

/// The independent classification axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Runtime,
    Scheduler,
    ImageFormat,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Runtime, Category::Scheduler, Category::ImageFormat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Runtime => "runtime",
            Category::Scheduler => "scheduler",
            Category::ImageFormat => "image_format",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One probe's finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub category: Category,
    pub value: String,
    pub confidence: f64,
    pub source: String,
}

impl Evidence {
    /// Confidence is clamped into `[0.0, 1.0]`; NaN becomes `0.0`.
    pub fn new(
        category: Category,
        value: impl Into<String>,
        confidence: f64,
        source: impl Into<String>,
    ) -> Self {
        let value = value.into();
        let source = source.into();
        debug_assert!(!value.is_empty(), "evidence value must not be empty");
        debug_assert!(!source.is_empty(), "evidence source must not be empty");

        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            category,
            value,
            confidence,
            source,
        }
    }
}

/// `Ok(None)` means the probe ran and found nothing.
pub type ProbeResult = Result<Option<Evidence>, ProbeError>;

pub trait Probe: Send + Sync {
    /// Stable identifier, also used as the evidence source.
    fn name(&self) -> &'static str;

    /// Higher runs earlier. Has no effect beyond ordering.
    fn priority(&self) -> i32;

    /// Inspect the environment. Must only read.
    ///
    /// Probes that can block have to honor `ctx`; bounded file and
    /// environment lookups may ignore it.
    fn execute(&self, ctx: &Context) -> ProbeResult;
}

impl<P: Probe + ?Sized> Probe for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn priority(&self) -> i32 {
        (**self).priority()
    }

    fn execute(&self, ctx: &Context) -> ProbeResult {
        (**self).execute(ctx)
    }
}

/// Stat `path`, folding "not found" into `false`.
pub(crate) fn path_exists(fs: &dyn FileSystem, path: &str) -> Result<bool, ProbeError> {
    fs.exists(Path::new(path))
        .map_err(|source| ProbeError::io(path, source))
}

/// Read `path` as text, folding "not found" into `None`.
pub(crate) fn read_optional(fs: &dyn FileSystem, path: &str) -> Result<Option<String>, ProbeError> {
    match fs.read(Path::new(path)) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ProbeError::io(path, source)),
    }
}

/// Read `path` and report whether it contains any of `needles`.
pub(crate) fn file_contains_any(
    fs: &dyn FileSystem,
    path: &str,
    needles: &[&str],
) -> Result<bool, ProbeError> {
    Ok(read_optional(fs, path)?
        .is_some_and(|content| needles.iter().any(|needle| content.contains(needle))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryFileSystem;
    use std::io;

    #[test]
    fn test_category_as_str() {
        assert_eq!(Category::Runtime.as_str(), "runtime");
        assert_eq!(Category::Scheduler.as_str(), "scheduler");
        assert_eq!(Category::ImageFormat.as_str(), "image_format");
    }

    #[test]
    fn test_evidence_confidence_is_clamped() {
        let high = Evidence::new(Category::Runtime, "docker", 1.7, "test");
        assert_eq!(high.confidence, 1.0);

        let low = Evidence::new(Category::Runtime, "docker", -0.2, "test");
        assert_eq!(low.confidence, 0.0);

        let nan = Evidence::new(Category::Runtime, "docker", f64::NAN, "test");
        assert_eq!(nan.confidence, 0.0);
    }

    #[test]
    fn test_read_optional_missing_file_is_absence() {
        let fs = MemoryFileSystem::new();
        assert_eq!(read_optional(&fs, "/proc/self/cgroup").unwrap(), None);
    }

    #[test]
    fn test_read_optional_unexpected_failure_is_error() {
        let fs = MemoryFileSystem::new().with_error(
            "/proc/self/cgroup",
            io::ErrorKind::PermissionDenied,
        );
        let err = read_optional(&fs, "/proc/self/cgroup").unwrap_err();
        assert!(matches!(err, ProbeError::Io { .. }));
    }

    #[test]
    fn test_file_contains_any() {
        let fs = MemoryFileSystem::new().with_file("/proc/self/cgroup", "0::/system.slice/crio-abc");
        assert!(file_contains_any(&fs, "/proc/self/cgroup", &["docker", "crio"]).unwrap());
        assert!(!file_contains_any(&fs, "/proc/self/cgroup", &["mesos"]).unwrap());
    }
}
