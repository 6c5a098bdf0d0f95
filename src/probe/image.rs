//! Image format probes.

use std::sync::Arc;

use super::{path_exists, Category, Environment, Evidence, FileSystem, Probe, ProbeResult};
use crate::engine::Context;

pub const FORMAT_DOCKER: &str = "docker";
pub const FORMAT_ACI: &str = "aci";
pub const FORMAT_CRI: &str = "cri";
pub const FORMAT_OCI: &str = "oci";
pub const FORMAT_SINGULARITY: &str = "singularity";

fn image_format(value: &str, confidence: f64, source: &'static str) -> ProbeResult {
    Ok(Some(Evidence::new(
        Category::ImageFormat,
        value,
        confidence,
        source,
    )))
}

pub struct DockerImageProbe {
    fs: Arc<dyn FileSystem>,
}

impl DockerImageProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for DockerImageProbe {
    fn name(&self) -> &'static str {
        "docker-image-format"
    }

    fn priority(&self) -> i32 {
        95
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), "/.dockerenv")? {
            return image_format(FORMAT_DOCKER, 0.95, self.name());
        }
        if path_exists(self.fs.as_ref(), "/.dockerinit")? {
            return image_format(FORMAT_DOCKER, 0.90, self.name());
        }
        Ok(None)
    }
}

pub struct CriImageProbe {
    fs: Arc<dyn FileSystem>,
}

impl CriImageProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for CriImageProbe {
    fn name(&self) -> &'static str {
        "cri-image-format"
    }

    fn priority(&self) -> i32 {
        95
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), "/run/.containerenv")? {
            return image_format(FORMAT_CRI, 0.90, self.name());
        }
        Ok(None)
    }
}

/// App Container Image, the rkt-era format.
pub struct AciEnvProbe {
    env: Arc<Environment>,
}

impl AciEnvProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for AciEnvProbe {
    fn name(&self) -> &'static str {
        "aci-env"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.any_set(&["AC_METADATA_URL", "AC_APP_NAME"]) {
            return image_format(FORMAT_ACI, 0.95, self.name());
        }
        Ok(None)
    }
}

pub struct OciImageProbe {
    fs: Arc<dyn FileSystem>,
    env: Arc<Environment>,
}

impl OciImageProbe {
    pub fn new(fs: Arc<dyn FileSystem>, env: Arc<Environment>) -> Self {
        Self { fs, env }
    }
}

impl Probe for OciImageProbe {
    fn name(&self) -> &'static str {
        "oci-image-format"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), "/var/lib/containers")? {
            return image_format(FORMAT_OCI, 0.80, self.name());
        }
        if self.env.is_set("PODMAN_SYSTEMD_UNIT") {
            return image_format(FORMAT_OCI, 0.85, self.name());
        }
        Ok(None)
    }
}

pub struct SingularityImageProbe {
    env: Arc<Environment>,
}

impl SingularityImageProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for SingularityImageProbe {
    fn name(&self) -> &'static str {
        "singularity-image-format"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self
            .env
            .any_set(&["SINGULARITY_CONTAINER", "APPTAINER_CONTAINER"])
        {
            return image_format(FORMAT_SINGULARITY, 0.95, self.name());
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryFileSystem;

    fn run(probe: &dyn Probe) -> Option<(String, f64)> {
        probe
            .execute(&Context::background())
            .unwrap()
            .map(|e| {
                assert_eq!(e.category, Category::ImageFormat);
                (e.value, e.confidence)
            })
    }

    #[test]
    fn test_docker_image_markers() {
        let fs = Arc::new(MemoryFileSystem::new().with_marker("/.dockerenv"));
        assert_eq!(run(&DockerImageProbe::new(fs)), Some(("docker".into(), 0.95)));

        let fs = Arc::new(MemoryFileSystem::new().with_marker("/.dockerinit"));
        assert_eq!(run(&DockerImageProbe::new(fs)), Some(("docker".into(), 0.90)));
    }

    #[test]
    fn test_cri_image() {
        let fs = Arc::new(MemoryFileSystem::new().with_marker("/run/.containerenv"));
        assert_eq!(run(&CriImageProbe::new(fs)), Some(("cri".into(), 0.90)));
    }

    #[test]
    fn test_aci_env() {
        let env = Arc::new(Environment::empty().with_var("AC_METADATA_URL", "http://meta"));
        assert_eq!(run(&AciEnvProbe::new(env)), Some(("aci".into(), 0.95)));

        let env = Arc::new(Environment::empty());
        assert_eq!(run(&AciEnvProbe::new(env)), None);
    }

    #[test]
    fn test_oci_storage_then_podman_unit() {
        let fs = Arc::new(MemoryFileSystem::new().with_marker("/var/lib/containers"));
        let env = Arc::new(Environment::empty().with_var("PODMAN_SYSTEMD_UNIT", "web.service"));
        assert_eq!(run(&OciImageProbe::new(fs, env.clone())), Some(("oci".into(), 0.80)));

        let fs = Arc::new(MemoryFileSystem::new());
        assert_eq!(run(&OciImageProbe::new(fs, env)), Some(("oci".into(), 0.85)));
    }

    #[test]
    fn test_singularity_image() {
        let env = Arc::new(Environment::empty().with_var("APPTAINER_CONTAINER", "/img.sif"));
        assert_eq!(
            run(&SingularityImageProbe::new(env)),
            Some(("singularity".into(), 0.95))
        );
    }
}
