use std::sync::Arc;
use std::time::Duration;

use super::image::{
    AciEnvProbe, CriImageProbe, DockerImageProbe, OciImageProbe, SingularityImageProbe,
};
use super::network::{KubernetesApiProbe, SwarmPortProbe, DEFAULT_NETWORK_TIMEOUT};
use super::runtime::{
    ContainerdFileProbe, CrioProbe, DockerCgroupProbe, DockerFileProbe, FirecrackerProbe,
    GVisorProbe, KataProbe, LxdSocketProbe, OpenVzProbe, PodmanProbe, RktEnvProbe,
    SingularityProbe, SysboxProbe, WasmProbe,
};
use super::scheduler::{
    AzureContainerInstancesProbe, CloudRunProbe, EcsProbe, FargateProbe, KubernetesEnvProbe,
    KubernetesServiceAccountProbe, LambdaProbe, MesosCgroupProbe, MesosEnvProbe, NomadEnvProbe,
    NomadHostnameProbe,
};
use super::{
    Environment, FileSystem, HostIdentity, Network, OsFileSystem, OsNetwork, Probe,
    SystemIdentity,
};

/// Collaborators shared by every probe in a roster.
#[derive(Clone)]
pub struct Accessors {
    pub fs: Arc<dyn FileSystem>,
    pub network: Arc<dyn Network>,
    pub env: Arc<Environment>,
    pub identity: Arc<dyn HostIdentity>,
    pub network_timeout: Duration,
}

impl Accessors {
    /// The real host, with the environment captured now.
    pub fn system() -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(OsFileSystem);
        Self {
            identity: Arc::new(SystemIdentity::new(fs.clone())),
            fs,
            network: Arc::new(OsNetwork),
            env: Arc::new(Environment::capture()),
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }

    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }
}

impl Default for Accessors {
    fn default() -> Self {
        Self::system()
    }
}

/// Every built-in probe, in registration order.
pub fn default_probes(accessors: &Accessors) -> Vec<Box<dyn Probe>> {
    let mut probes = fast_probes(accessors);
    probes.push(Box::new(SwarmPortProbe::new(
        accessors.network.clone(),
        accessors.network_timeout,
    )));
    probes.push(Box::new(KubernetesApiProbe::new(
        accessors.network.clone(),
        accessors.network_timeout,
    )));
    probes
}

/// Every built-in probe that stays off the network.
pub fn fast_probes(accessors: &Accessors) -> Vec<Box<dyn Probe>> {
    let fs = &accessors.fs;
    let env = &accessors.env;

    vec![
        // runtime
        Box::new(DockerFileProbe::new(fs.clone())),
        Box::new(WasmProbe::new()),
        Box::new(PodmanProbe::new(fs.clone(), env.clone())),
        Box::new(CrioProbe::new(fs.clone())),
        Box::new(ContainerdFileProbe::new(fs.clone())),
        Box::new(LxdSocketProbe::new(fs.clone())),
        Box::new(DockerCgroupProbe::new(fs.clone())),
        Box::new(OpenVzProbe::new(fs.clone())),
        Box::new(FirecrackerProbe::new(fs.clone())),
        Box::new(KataProbe::new(fs.clone())),
        Box::new(GVisorProbe::new(fs.clone())),
        Box::new(SysboxProbe::new(fs.clone(), env.clone())),
        Box::new(SingularityProbe::new(env.clone())),
        Box::new(RktEnvProbe::new(env.clone())),
        // scheduler
        Box::new(KubernetesServiceAccountProbe::new(fs.clone())),
        Box::new(KubernetesEnvProbe::new(env.clone())),
        Box::new(NomadEnvProbe::new(env.clone())),
        Box::new(MesosEnvProbe::new(env.clone())),
        Box::new(EcsProbe::new(env.clone())),
        Box::new(FargateProbe::new(env.clone())),
        Box::new(CloudRunProbe::new(env.clone())),
        Box::new(LambdaProbe::new(env.clone())),
        Box::new(AzureContainerInstancesProbe::new(env.clone())),
        Box::new(NomadHostnameProbe::new(accessors.identity.clone())),
        Box::new(MesosCgroupProbe::new(fs.clone())),
        // image format
        Box::new(DockerImageProbe::new(fs.clone())),
        Box::new(CriImageProbe::new(fs.clone())),
        Box::new(AciEnvProbe::new(env.clone())),
        Box::new(OciImageProbe::new(fs.clone(), env.clone())),
        Box::new(SingularityImageProbe::new(env.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedIdentity, MemoryFileSystem, StaticNetwork};
    use std::collections::HashSet;

    fn accessors() -> Accessors {
        Accessors {
            fs: Arc::new(MemoryFileSystem::new()),
            network: Arc::new(StaticNetwork::new()),
            env: Arc::new(Environment::empty()),
            identity: Arc::new(FixedIdentity::new()),
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }

    #[test]
    fn test_default_roster_names_are_unique() {
        let probes = default_probes(&accessors());
        let names: HashSet<_> = probes.iter().map(|p| p.name()).collect();
        assert_eq!(names.len(), probes.len());
        assert_eq!(probes.len(), 32);
    }

    #[test]
    fn test_fast_roster_skips_network() {
        let names: Vec<_> = fast_probes(&accessors()).iter().map(|p| p.name()).collect();
        assert_eq!(names.len(), 30);
        assert!(!names.contains(&"swarm-port-probe"));
        assert!(!names.contains(&"kubernetes-api-probe"));
    }
}
