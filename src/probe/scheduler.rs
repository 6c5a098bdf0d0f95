//! Orchestration scheduler probes that only look at local state.
//!
//! The network-backed scheduler checks live in [`super::network`].

use std::sync::Arc;

use tracing::trace;

use super::{
    file_contains_any, path_exists, Category, Environment, Evidence, FileSystem, HostIdentity,
    Probe, ProbeResult,
};
use crate::engine::Context;

pub const SCHEDULER_KUBERNETES: &str = "kubernetes";
pub const SCHEDULER_NOMAD: &str = "nomad";
pub const SCHEDULER_MESOS: &str = "mesos";
pub const SCHEDULER_SWARM: &str = "swarm";
pub const SCHEDULER_ECS: &str = "ecs";
pub const SCHEDULER_FARGATE: &str = "fargate";
pub const SCHEDULER_CLOUD_RUN: &str = "cloud-run";
pub const SCHEDULER_LAMBDA: &str = "lambda";
pub const SCHEDULER_ACI: &str = "aci";

pub const SERVICE_ACCOUNT_TOKEN: &str = "/run/secrets/kubernetes.io/serviceaccount/token";

pub(crate) fn scheduler(value: &str, confidence: f64, source: &'static str) -> ProbeResult {
    Ok(Some(Evidence::new(Category::Scheduler, value, confidence, source)))
}

pub struct KubernetesServiceAccountProbe {
    fs: Arc<dyn FileSystem>,
}

impl KubernetesServiceAccountProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for KubernetesServiceAccountProbe {
    fn name(&self) -> &'static str {
        "kubernetes-service-account"
    }

    fn priority(&self) -> i32 {
        95
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if path_exists(self.fs.as_ref(), SERVICE_ACCOUNT_TOKEN)? {
            return scheduler(SCHEDULER_KUBERNETES, 0.99, self.name());
        }
        Ok(None)
    }
}

pub struct KubernetesEnvProbe {
    env: Arc<Environment>,
}

impl KubernetesEnvProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for KubernetesEnvProbe {
    fn name(&self) -> &'static str {
        "kubernetes-env"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.is_set("KUBERNETES_SERVICE_HOST") {
            return scheduler(SCHEDULER_KUBERNETES, 0.95, self.name());
        }
        Ok(None)
    }
}

pub struct NomadEnvProbe {
    env: Arc<Environment>,
}

impl NomadEnvProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for NomadEnvProbe {
    fn name(&self) -> &'static str {
        "nomad-env"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.is_set("NOMAD_TASK_DIR") {
            return scheduler(SCHEDULER_NOMAD, 0.95, self.name());
        }
        Ok(None)
    }
}

pub struct NomadHostnameProbe {
    identity: Arc<dyn HostIdentity>,
}

impl NomadHostnameProbe {
    pub fn new(identity: Arc<dyn HostIdentity>) -> Self {
        Self { identity }
    }
}

impl Probe for NomadHostnameProbe {
    fn name(&self) -> &'static str {
        "nomad-hostname"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        // An unreadable hostname is simply no signal here.
        let hostname = match self.identity.hostname() {
            Ok(hostname) => hostname,
            Err(err) => {
                trace!(error = %err, "hostname unavailable");
                return Ok(None);
            }
        };
        if hostname.starts_with("nomad-task-") {
            return scheduler(SCHEDULER_NOMAD, 0.85, self.name());
        }
        Ok(None)
    }
}

pub struct MesosEnvProbe {
    env: Arc<Environment>,
}

impl MesosEnvProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for MesosEnvProbe {
    fn name(&self) -> &'static str {
        "mesos-env"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.any_set(&["MESOS_TASK_ID", "MESOS_CONTAINER_NAME"]) {
            return scheduler(SCHEDULER_MESOS, 0.95, self.name());
        }
        Ok(None)
    }
}

pub struct MesosCgroupProbe {
    fs: Arc<dyn FileSystem>,
}

impl MesosCgroupProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Probe for MesosCgroupProbe {
    fn name(&self) -> &'static str {
        "mesos-cgroup"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if file_contains_any(self.fs.as_ref(), "/proc/1/cgroup", &["mesos"])? {
            return scheduler(SCHEDULER_MESOS, 0.90, self.name());
        }
        Ok(None)
    }
}

pub struct EcsProbe {
    env: Arc<Environment>,
}

impl EcsProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for EcsProbe {
    fn name(&self) -> &'static str {
        "aws-ecs"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self
            .env
            .any_set(&["ECS_CONTAINER_METADATA_URI", "ECS_CONTAINER_METADATA_URI_V4"])
        {
            return scheduler(SCHEDULER_ECS, 0.98, self.name());
        }
        Ok(None)
    }
}

/// Fargate is ECS with a distinct launch type, so it outranks [`EcsProbe`]
/// only when the execution environment says so explicitly.
pub struct FargateProbe {
    env: Arc<Environment>,
}

impl FargateProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for FargateProbe {
    fn name(&self) -> &'static str {
        "aws-fargate"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        let Some(execution_env) = self.env.get("AWS_EXECUTION_ENV") else {
            return Ok(None);
        };
        if execution_env.to_lowercase().contains("fargate") {
            return scheduler(SCHEDULER_FARGATE, 0.99, self.name());
        }
        if self.env.is_set("ECS_CONTAINER_METADATA_URI_V4") {
            return scheduler(SCHEDULER_FARGATE, 0.85, self.name());
        }
        Ok(None)
    }
}

pub struct CloudRunProbe {
    env: Arc<Environment>,
}

impl CloudRunProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for CloudRunProbe {
    fn name(&self) -> &'static str {
        "google-cloud-run"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.is_set("K_SERVICE") {
            return scheduler(SCHEDULER_CLOUD_RUN, 0.98, self.name());
        }
        if self.env.is_set("K_REVISION") {
            return scheduler(SCHEDULER_CLOUD_RUN, 0.95, self.name());
        }
        Ok(None)
    }
}

pub struct LambdaProbe {
    env: Arc<Environment>,
}

impl LambdaProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for LambdaProbe {
    fn name(&self) -> &'static str {
        "aws-lambda-container"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.is_set("AWS_LAMBDA_FUNCTION_NAME") {
            return scheduler(SCHEDULER_LAMBDA, 0.99, self.name());
        }
        if self.env.is_set("LAMBDA_TASK_ROOT") {
            return scheduler(SCHEDULER_LAMBDA, 0.98, self.name());
        }
        Ok(None)
    }
}

pub struct AzureContainerInstancesProbe {
    env: Arc<Environment>,
}

impl AzureContainerInstancesProbe {
    pub fn new(env: Arc<Environment>) -> Self {
        Self { env }
    }
}

impl Probe for AzureContainerInstancesProbe {
    fn name(&self) -> &'static str {
        "azure-container-instances"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        if self.env.is_set("ACI_RESOURCE_GROUP") {
            return scheduler(SCHEDULER_ACI, 0.98, self.name());
        }
        if self.env.is_set("CONTAINER_GROUP_NAME") {
            return scheduler(SCHEDULER_ACI, 0.90, self.name());
        }
        Ok(None)
    }
}
