//! Network reachability probes.
//!
//! Reachability alone cannot rule out an unrelated service on the same port,
//! so these never report more than 0.80. Each call is bounded by the tighter
//! of the probe timeout and the caller's context.

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use super::scheduler::{scheduler, SCHEDULER_KUBERNETES, SCHEDULER_SWARM};
use super::{Network, Probe, ProbeResult};
use crate::engine::Context;

pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(2);

pub const SWARM_MANAGER_ADDRESS: &str = "127.0.0.1:2377";
pub const KUBERNETES_API_URL: &str = "http://kubernetes.default.svc";

pub struct SwarmPortProbe {
    network: Arc<dyn Network>,
    timeout: Duration,
    address: String,
}

impl SwarmPortProbe {
    pub fn new(network: Arc<dyn Network>, timeout: Duration) -> Self {
        Self {
            network,
            timeout,
            address: SWARM_MANAGER_ADDRESS.to_string(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }
}

impl Probe for SwarmPortProbe {
    fn name(&self) -> &'static str {
        "swarm-port-probe"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn execute(&self, ctx: &Context) -> ProbeResult {
        ctx.check()?;
        let timeout = ctx.bound(self.timeout);
        if timeout.is_zero() {
            ctx.check()?;
            return Ok(None);
        }

        match self.network.dial_timeout(&self.address, timeout) {
            Ok(()) => scheduler(SCHEDULER_SWARM, 0.80, self.name()),
            Err(err) => {
                // A caller deadline that fired mid-dial is cancellation, not absence.
                ctx.check()?;
                trace!(address = %self.address, error = %err, "swarm manager port unreachable");
                Ok(None)
            }
        }
    }
}

pub struct KubernetesApiProbe {
    network: Arc<dyn Network>,
    timeout: Duration,
    url: String,
}

impl KubernetesApiProbe {
    pub fn new(network: Arc<dyn Network>, timeout: Duration) -> Self {
        Self {
            network,
            timeout,
            url: KUBERNETES_API_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl Probe for KubernetesApiProbe {
    fn name(&self) -> &'static str {
        "kubernetes-api-probe"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn execute(&self, ctx: &Context) -> ProbeResult {
        let probe_ctx = ctx.with_timeout(self.timeout);

        // Any answer counts; the API server rejects anonymous requests anyway.
        match self.network.http_get(&probe_ctx, &self.url) {
            Ok(response) => {
                trace!(url = %self.url, status = response.status, "kubernetes API answered");
                scheduler(SCHEDULER_KUBERNETES, 0.80, self.name())
            }
            Err(err) => {
                ctx.check()?;
                trace!(url = %self.url, error = %err, "kubernetes API unreachable");
                Ok(None)
            }
        }
    }
}
