//! Container runtime probes.

use std::sync::Arc;

use tracing::trace;

use super::{
    file_contains_any, path_exists, read_optional, Category, Environment, Evidence, FileSystem,
    Probe, ProbeResult,
};
use crate::engine::Context;

pub const RUNTIME_DOCKER: &str = "docker";
pub const RUNTIME_RKT: &str = "rkt";
pub const RUNTIME_CONTAINERD: &str = "containerd";
pub const RUNTIME_LXD: &str = "lxd";
pub const RUNTIME_OPENVZ: &str = "openvz";
pub const RUNTIME_WASM: &str = "wasm";
pub const RUNTIME_PODMAN: &str = "podman";
pub const RUNTIME_CRIO: &str = "cri-o";
pub const RUNTIME_FIRECRACKER: &str = "firecracker";
pub const RUNTIME_KATA: &str = "kata";
pub const RUNTIME_GVISOR: &str = "gvisor";
pub const RUNTIME_SYSBOX: &str = "sysbox";
pub const RUNTIME_SINGULARITY: &str = "singularity";
pub const RUNTIME_APPTAINER: &str = "apptainer";

const SELF_CGROUP: &str = "/proc/self/cgroup";
const CONTAINERENV: &str = "/run/.containerenv";
const DMI_PRODUCT_NAME: &str = "/sys/class/dmi/id/product_name";

fn runtime(value: &str, confidence: f64, source: &'static str) -> ProbeResult {
    Ok(Some(Evidence::new(Category::Runtime, value, confidence, source)))
}

pub struct DockerFileProbe {
    fs: Arc<dyn FileSystem>,
}

impl DockerFileProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for DockerFileProbe {
    fn name(&self) -> &'static str {
        "docker-file-marker"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), "/.dockerenv")? {
            return runtime(RUNTIME_DOCKER, 0.95, self.name());
        }
        // legacy marker
        if path_exists(self.fs.as_ref(), "/.dockerinit")? {
            return runtime(RUNTIME_DOCKER, 0.90, self.name());
        }
        Ok(None)
    }
}

pub struct DockerCgroupProbe {
    fs: Arc<dyn FileSystem>,
}

impl DockerCgroupProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for DockerCgroupProbe {
    fn name(&self) -> &'static str {
        "docker-cgroup"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if file_contains_any(self.fs.as_ref(), SELF_CGROUP, &["docker"])? {
            return runtime(RUNTIME_DOCKER, 0.85, self.name());
        }
        Ok(None)
    }
}

pub struct PodmanProbe {
    fs: Arc<dyn FileSystem>,
    env: Arc<Environment>,
}

impl PodmanProbe {
    pub fn new(fs: Arc<dyn FileSystem>, env: Arc<Environment>) -> Self {
        Self { fs, env }
    }
}

impl Probe for PodmanProbe {
    fn name(&self) -> &'static str {
        "podman-marker"
    }

    fn priority(&self) -> i32 {
        95
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), CONTAINERENV)? {
            match read_optional(self.fs.as_ref(), CONTAINERENV) {
                Ok(Some(content)) if content.contains("podman") => {
                    return runtime(RUNTIME_PODMAN, 0.95, self.name());
                }
                // CRI-O writes the same file
                Ok(_) => return runtime(RUNTIME_PODMAN, 0.70, self.name()),
                Err(err) => {
                    trace!(error = %err, "containerenv present but unreadable");
                    return runtime(RUNTIME_PODMAN, 0.70, self.name());
                }
            }
        }
        if self.env.is_set("PODMAN_SYSTEMD_UNIT") {
            return runtime(RUNTIME_PODMAN, 0.90, self.name());
        }
        Ok(None)
    }
}

pub struct CrioProbe {
    fs: Arc<dyn FileSystem>,
}

impl CrioProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for CrioProbe {
    fn name(&self) -> &'static str {
        "cri-o-marker"
    }

    fn priority(&self) -> i32 {
        95
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), "/var/run/crio/crio.sock")? {
            return runtime(RUNTIME_CRIO, 0.95, self.name());
        }
        if file_contains_any(self.fs.as_ref(), SELF_CGROUP, &["crio"])? {
            return runtime(RUNTIME_CRIO, 0.90, self.name());
        }
        Ok(None)
    }
}

pub struct ContainerdFileProbe {
    fs: Arc<dyn FileSystem>,
}

impl ContainerdFileProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for ContainerdFileProbe {
    fn name(&self) -> &'static str {
        "containerd-file-marker"
    }

    fn priority(&self) -> i32 {
        95
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), CONTAINERENV)? {
            return runtime(RUNTIME_CONTAINERD, 0.90, self.name());
        }
        Ok(None)
    }
}

pub struct RktEnvProbe {
    env: Arc<Environment>,
}

impl RktEnvProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for RktEnvProbe {
    fn name(&self) -> &'static str {
        "rkt-env"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.any_set(&["AC_METADATA_URL", "AC_APP_NAME"]) {
            return runtime(RUNTIME_RKT, 0.95, self.name());
        }
        Ok(None)
    }
}

pub struct LxdSocketProbe {
    fs: Arc<dyn FileSystem>,
}

impl LxdSocketProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for LxdSocketProbe {
    fn name(&self) -> &'static str {
        "lxd-socket"
    }

    fn priority(&self) -> i32 {
        95
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), "/dev/lxd/sock")? {
            return runtime(RUNTIME_LXD, 0.95, self.name());
        }
        Ok(None)
    }
}

pub struct OpenVzProbe {
    fs: Arc<dyn FileSystem>,
}

impl OpenVzProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for OpenVzProbe {
    fn name(&self) -> &'static str {
        "openvz-proc"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), "/proc/vz")? {
            return runtime(RUNTIME_OPENVZ, 0.90, self.name());
        }
        Ok(None)
    }
}

pub struct FirecrackerProbe {
    fs: Arc<dyn FileSystem>,
}

impl FirecrackerProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for FirecrackerProbe {
    fn name(&self) -> &'static str {
        "firecracker-dmi"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        let product = read_optional(self.fs.as_ref(), DMI_PRODUCT_NAME)?;
        if product.as_deref().map(str::trim) == Some("Firecracker") {
            return runtime(RUNTIME_FIRECRACKER, 0.98, self.name());
        }
        Ok(None)
    }
}

pub struct KataProbe {
    fs: Arc<dyn FileSystem>,
}

impl KataProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for KataProbe {
    fn name(&self) -> &'static str {
        "kata-containers"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), "/run/kata-containers")? {
            return runtime(RUNTIME_KATA, 0.95, self.name());
        }

        // Kata guests run on QEMU, but so does any other QEMU VM.
        if file_contains_any(self.fs.as_ref(), DMI_PRODUCT_NAME, &["QEMU"])?
            && file_contains_any(self.fs.as_ref(), "/proc/cpuinfo", &["QEMU"])?
        {
            return runtime(RUNTIME_KATA, 0.60, self.name());
        }
        Ok(None)
    }
}

pub struct GVisorProbe {
    fs: Arc<dyn FileSystem>,
}

impl GVisorProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for GVisorProbe {
    fn name(&self) -> &'static str {
        "gvisor-marker"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if file_contains_any(self.fs.as_ref(), SELF_CGROUP, &["runsc", "gvisor"])? {
            return runtime(RUNTIME_GVISOR, 0.95, self.name());
        }
        if path_exists(self.fs.as_ref(), "/proc/self/root/dev/gvisor")? {
            return runtime(RUNTIME_GVISOR, 0.98, self.name());
        }
        Ok(None)
    }
}

pub struct SysboxProbe {
    fs: Arc<dyn FileSystem>,
    env: Arc<Environment>,
}

impl SysboxProbe {
    pub fn new(fs: Arc<dyn FileSystem>, env: Arc<Environment>) -> Self {
        Self { fs, env }
    }
}

impl Probe for SysboxProbe {
    fn name(&self) -> &'static str {
        "sysbox-marker"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.is_set("SYSBOX_CONTAINER") {
            return runtime(RUNTIME_SYSBOX, 0.98, self.name());
        }
        if file_contains_any(self.fs.as_ref(), SELF_CGROUP, &["sysbox"])? {
            return runtime(RUNTIME_SYSBOX, 0.90, self.name());
        }
        Ok(None)
    }
}

/// Singularity and its successor Apptainer, common on HPC clusters.
pub struct SingularityProbe {
    env: Arc<Environment>,
}

impl SingularityProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for SingularityProbe {
    fn name(&self) -> &'static str {
        "singularity-apptainer"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.is_set("SINGULARITY_CONTAINER") {
            return runtime(RUNTIME_SINGULARITY, 0.99, self.name());
        }
        if self.env.is_set("APPTAINER_CONTAINER") {
            return runtime(RUNTIME_APPTAINER, 0.99, self.name());
        }
        if self.env.is_set("SINGULARITY_NAME") {
            return runtime(RUNTIME_SINGULARITY, 0.95, self.name());
        }
        Ok(None)
    }
}

/// Reports a WebAssembly build target. The answer is fixed at compile time.
#[derive(Debug, Clone, Copy)]
pub struct WasmProbe {
    is_wasm: bool,
}

impl WasmProbe {
    pub fn new() -> Self {
        Self {
            is_wasm: cfg!(target_family = "wasm"),
        }
    }

    /// Force the build-target answer, for exercising both outcomes.
    pub fn with_target(is_wasm: bool) -> Self {
        Self { is_wasm }
    }
}

impl Default for WasmProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for WasmProbe {
    fn name(&self) -> &'static str {
        "wasm-build-target"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.is_wasm {
            return runtime(RUNTIME_WASM, 1.0, self.name());
        }
        Ok(None)
    }
}
