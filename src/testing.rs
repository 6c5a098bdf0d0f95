//! In-memory doubles for the accessor traits plus scripted probes.
//!
//! Public so crates that register their own probes can exercise them
//! without touching the real host.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::engine::Context;
use crate::error::{DetectError, ProbeError};
use crate::probe::{
    Category, Evidence, FileSystem, HostIdentity, HttpResponse, Network, Probe, ProbeResult,
};

#[derive(Debug, Clone)]
enum Entry {
    File(Vec<u8>),
    Error(io::ErrorKind),
    Unreadable(io::ErrorKind),
}

/// Filesystem backed by a map of absolute paths.
///
/// Paths that were never registered behave as missing.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    entries: HashMap<PathBuf, Entry>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(path.into(), Entry::File(content.into()));
        self
    }

    /// An empty file, for probes that only stat.
    pub fn with_marker(self, path: impl Into<PathBuf>) -> Self {
        self.with_file(path, Vec::new())
    }

    /// Both `exists` and `read` fail with `kind` for this path.
    pub fn with_error(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.entries.insert(path.into(), Entry::Error(kind));
        self
    }

    /// The path exists but reading it fails with `kind`.
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.entries.insert(path.into(), Entry::Unreadable(kind));
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match self.entries.get(path) {
            Some(Entry::File(_) | Entry::Unreadable(_)) => Ok(true),
            Some(Entry::Error(kind)) => Err(io::Error::from(*kind)),
            None => Ok(false),
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.entries.get(path) {
            Some(Entry::File(content)) => Ok(content.clone()),
            Some(Entry::Error(kind) | Entry::Unreadable(kind)) => Err(io::Error::from(*kind)),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}

/// Network where only the listed ports and URLs answer.
#[derive(Debug, Default)]
pub struct StaticNetwork {
    open_ports: HashSet<String>,
    http: HashMap<String, u16>,
    http_delay: Option<Duration>,
    dials: Mutex<Vec<Duration>>,
}

impl StaticNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_open_port(mut self, address: impl Into<String>) -> Self {
        self.open_ports.insert(address.into());
        self
    }

    pub fn with_http(mut self, url: impl Into<String>, status: u16) -> Self {
        self.http.insert(url.into(), status);
        self
    }

    /// Every GET stalls this long before answering, unless its context
    /// expires first.
    pub fn with_http_delay(mut self, delay: Duration) -> Self {
        self.http_delay = Some(delay);
        self
    }

    /// Timeouts passed to `dial_timeout`, in call order.
    pub fn dial_timeouts(&self) -> Vec<Duration> {
        self.dials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Network for StaticNetwork {
    fn dial_timeout(&self, address: &str, timeout: Duration) -> io::Result<()> {
        self.dials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(timeout);

        if self.open_ports.contains(address) {
            Ok(())
        } else {
            Err(io::Error::from(io::ErrorKind::ConnectionRefused))
        }
    }

    fn http_get(&self, ctx: &Context, url: &str) -> io::Result<HttpResponse> {
        if let Some(delay) = self.http_delay {
            ctx.sleep(delay)
                .map_err(|err| io::Error::new(io::ErrorKind::TimedOut, err))?;
        }
        ctx.check()
            .map_err(|err| io::Error::new(io::ErrorKind::TimedOut, err))?;

        self.http
            .get(url)
            .map(|&status| HttpResponse { status })
            .ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))
    }
}

/// Identity with fixed answers.
#[derive(Debug, Clone)]
pub struct FixedIdentity {
    pid: u32,
    hostname: Option<String>,
    container_id: Option<String>,
}

impl FixedIdentity {
    /// The real pid, hostname `test-host`, no container id.
    pub fn new() -> Self {
        Self {
            pid: std::process::id(),
            hostname: Some("test-host".to_string()),
            container_id: None,
        }
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Hostname lookups fail.
    pub fn without_hostname(mut self) -> Self {
        self.hostname = None;
        self
    }

    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = Some(id.into());
        self
    }
}

impl Default for FixedIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl HostIdentity for FixedIdentity {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn hostname(&self) -> io::Result<String> {
        self.hostname
            .clone()
            .ok_or_else(|| io::Error::other("hostname unavailable"))
    }

    fn container_id(&self) -> Option<String> {
        self.container_id.clone()
    }
}

/// Shared count of `execute` calls, readable after the probe has been
/// moved into an engine.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Names of probes in the order they executed.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<&'static str>>>);

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, name: &'static str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name);
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Found(Evidence),
    Absent,
    Failure(io::ErrorKind),
    Cancelled(DetectError),
}

/// Probe that returns the same canned outcome on every call.
#[derive(Debug, Clone)]
pub struct ScriptedProbe {
    name: &'static str,
    priority: i32,
    outcome: Outcome,
    calls: CallCounter,
    log: Option<ExecutionLog>,
}

impl ScriptedProbe {
    fn with_outcome(name: &'static str, priority: i32, outcome: Outcome) -> Self {
        Self {
            name,
            priority,
            outcome,
            calls: CallCounter::default(),
            log: None,
        }
    }

    pub fn found(
        name: &'static str,
        priority: i32,
        category: Category,
        value: &str,
        confidence: f64,
    ) -> Self {
        let evidence = Evidence::new(category, value, confidence, name);
        Self::with_outcome(name, priority, Outcome::Found(evidence))
    }

    pub fn absent(name: &'static str, priority: i32) -> Self {
        Self::with_outcome(name, priority, Outcome::Absent)
    }

    /// Fails with a permission error on a made-up path.
    pub fn failing(name: &'static str, priority: i32) -> Self {
        Self::with_outcome(
            name,
            priority,
            Outcome::Failure(io::ErrorKind::PermissionDenied),
        )
    }

    pub fn cancelling(name: &'static str, priority: i32, error: DetectError) -> Self {
        Self::with_outcome(name, priority, Outcome::Cancelled(error))
    }

    pub fn with_log(mut self, log: &ExecutionLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl Probe for ScriptedProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        self.calls.bump();
        if let Some(log) = &self.log {
            log.record(self.name);
        }

        match &self.outcome {
            Outcome::Found(evidence) => Ok(Some(evidence.clone())),
            Outcome::Absent => Ok(None),
            Outcome::Failure(kind) => Err(ProbeError::io(
                format!("/scripted/{}", self.name),
                io::Error::from(*kind),
            )),
            Outcome::Cancelled(error) => Err(ProbeError::Cancelled(*error)),
        }
    }
}

/// Probe that waits on its context and never finds anything.
///
/// Without a deadline or cancellation it blocks for `duration`.
#[derive(Debug, Clone)]
pub struct BlockingProbe {
    priority: i32,
    duration: Duration,
    calls: CallCounter,
}

impl BlockingProbe {
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            duration: Duration::from_secs(60),
            calls: CallCounter::default(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl Probe for BlockingProbe {
    fn name(&self) -> &'static str {
        "blocking-probe"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn execute(&self, ctx: &Context) -> ProbeResult {
        self.calls.bump();
        ctx.sleep(self.duration)?;
        Ok(None)
    }
}
