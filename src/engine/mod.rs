pub mod cache;
pub mod context;
pub mod reconcile;

pub use cache::{DetectionCache, DEFAULT_CACHE_TTL};
pub use context::Context;
pub use reconcile::BestEvidence;

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::DetectError;
use crate::output::{Inventory, UNKNOWN_HOSTNAME};
use crate::probe::{
    default_probes, Accessors, Category, HostIdentity, Probe, SystemIdentity, UNDETERMINED,
};

/// Inputs to [`Engine::new`].
pub struct EngineConfig {
    pub probes: Vec<Box<dyn Probe>>,
    pub enable_caching: bool,
    pub cache_ttl: Duration,
}

impl EngineConfig {
    /// `probes` with caching on at the default TTL.
    pub fn new(probes: Vec<Box<dyn Probe>>) -> Self {
        Self {
            probes,
            enable_caching: true,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Runs a fixed roster of probes and folds their evidence into an
/// [`Inventory`].
///
/// The roster is sorted once, by descending priority, and never changes
/// afterwards. Probes registered with equal priority keep their relative
/// order.
pub struct Engine {
    probes: Vec<Box<dyn Probe>>,
    cache: Option<DetectionCache>,
    identity: Arc<dyn HostIdentity>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::assemble(
            config.probes,
            config.enable_caching.then_some(config.cache_ttl),
            Arc::new(SystemIdentity::default()),
        )
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    fn assemble(
        mut probes: Vec<Box<dyn Probe>>,
        cache_ttl: Option<Duration>,
        identity: Arc<dyn HostIdentity>,
    ) -> Self {
        probes.sort_by_key(|probe| Reverse(probe.priority()));
        Self {
            probes,
            cache: cache_ttl.map(DetectionCache::new),
            identity,
        }
    }

    /// Classify the current process.
    ///
    /// Probe failures are logged and skipped. The only errors returned are
    /// cancellation and deadline expiry, in which case no partial result is
    /// produced and the cache is left untouched.
    pub fn detect_all(&self, ctx: &Context) -> Result<Inventory, DetectError> {
        if let Some(cache) = &self.cache {
            if let Some(inventory) = cache.get() {
                debug!("detection cache hit");
                return Ok(inventory);
            }
            debug!("detection cache miss");
        }

        let mut best = BestEvidence::new();
        for probe in &self.probes {
            if let Err(err) = ctx.check() {
                debug!(next = probe.name(), "detection stopped: {err}");
                return Err(err);
            }

            debug!(probe = probe.name(), priority = probe.priority(), "running probe");
            match probe.execute(ctx) {
                Ok(Some(evidence)) => {
                    debug!(
                        probe = probe.name(),
                        category = %evidence.category,
                        value = %evidence.value,
                        confidence = evidence.confidence,
                        "evidence found"
                    );
                    best.offer(evidence);
                }
                Ok(None) => {}
                Err(err) => match err.cancellation() {
                    Some(cancel) => {
                        debug!(probe = probe.name(), "detection stopped: {cancel}");
                        return Err(cancel);
                    }
                    None => warn!(probe = probe.name(), error = %err, "probe failed"),
                },
            }
        }

        // the last step may have ignored the context and outlived it
        if let Err(err) = ctx.check() {
            debug!("detection finished after context ended: {err}");
            return Err(err);
        }

        let inventory = self.inventory_from(&best);
        info!(
            runtime = %inventory.runtime,
            scheduler = %inventory.scheduler,
            image_format = %inventory.image_format,
            "classification complete"
        );

        if let Some(cache) = &self.cache {
            cache.set(inventory.clone());
        }
        Ok(inventory)
    }

    fn inventory_from(&self, best: &BestEvidence) -> Inventory {
        let value_of =
            |category: Category| best.value(category).unwrap_or(UNDETERMINED).to_string();

        let hostname = match self.identity.hostname() {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => UNKNOWN_HOSTNAME.to_string(),
            Err(err) => {
                debug!(error = %err, "hostname lookup failed");
                UNKNOWN_HOSTNAME.to_string()
            }
        };

        Inventory {
            hostname,
            id: self
                .identity
                .container_id()
                .unwrap_or_else(|| UNDETERMINED.to_string()),
            image_format: value_of(Category::ImageFormat),
            pid: self.identity.pid(),
            runtime: value_of(Category::Runtime),
            scheduler: value_of(Category::Scheduler),
        }
    }

    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate();
        }
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Probe names in execution order.
    pub fn probe_names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }
}

impl Default for Engine {
    /// Every built-in probe against the real host, cached for five minutes.
    fn default() -> Self {
        let accessors = Accessors::system();
        Self::builder()
            .with_identity(accessors.identity.clone())
            .with_probes(default_probes(&accessors))
            .build()
    }
}

pub struct EngineBuilder {
    probes: Vec<Box<dyn Probe>>,
    cache_ttl: Option<Duration>,
    identity: Option<Arc<dyn HostIdentity>>,
}

impl EngineBuilder {
    /// No probes, caching on at the default TTL.
    pub fn new() -> Self {
        Self {
            probes: Vec::new(),
            cache_ttl: Some(DEFAULT_CACHE_TTL),
            identity: None,
        }
    }

    pub fn with_probe<P: Probe + 'static>(mut self, probe: P) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn with_probes<I>(mut self, probes: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Probe>>,
    {
        self.probes.extend(probes);
        self
    }

    pub fn with_caching(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn without_caching(mut self) -> Self {
        self.cache_ttl = None;
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn HostIdentity>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn build(self) -> Engine {
        let identity: Arc<dyn HostIdentity> = match self.identity {
            Some(identity) => identity,
            None => Arc::new(SystemIdentity::default()),
        };
        Engine::assemble(self.probes, self.cache_ttl, identity)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
