//! Container identity read from the process's own cgroup membership.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::engine::{Context, Engine};
use crate::output::Inventory;
use crate::probe::{Category, FileSystem};

const SELF_CGROUP: &str = "/proc/self/cgroup";

// Tried in order against every line; the first capture wins.
const ID_PATTERNS: &[&str] = &[
    r"/docker/([0-9a-f]{12,64})",
    r"docker-([0-9a-f]{12,64})\.scope",
    r"crio-([0-9a-f]{12,64})\.scope",
    r"cri-containerd-([0-9a-f]{12,64})\.scope",
    r"libpod-([0-9a-f]{12,64})\.scope",
    r"kubepods.*/([0-9a-f]{64})$",
];

fn id_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ID_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Extract a container id from cgroup file contents.
pub fn parse_container_id(cgroup: &str) -> Option<String> {
    cgroup.lines().map(str::trim).find_map(|line| {
        id_patterns()
            .iter()
            .find_map(|re| re.captures(line))
            .map(|caps| caps[1].to_string())
    })
}

/// Container id of the current process, if its cgroup path carries one.
///
/// Unreadable cgroup files count as "no id".
pub fn container_id(fs: &dyn FileSystem) -> Option<String> {
    let bytes = fs.read(Path::new(SELF_CGROUP)).ok()?;
    parse_container_id(&String::from_utf8_lossy(&bytes))
}

/// Cheap check that needs no probes: a docker marker file or a cgroup id.
pub fn has_container_markers(fs: &dyn FileSystem) -> bool {
    let marker = ["/.dockerenv", "/.dockerinit"]
        .iter()
        .any(|path| fs.exists(Path::new(path)).unwrap_or(false));
    marker || container_id(fs).is_some()
}

/// Markers first; the full roster of `engine` only runs when none are found.
pub fn is_container_with(fs: &dyn FileSystem, engine: &Engine) -> bool {
    if has_container_markers(fs) {
        return true;
    }
    engine
        .detect_all(&Context::background())
        .unwrap_or_else(|_| Inventory::fallback())
        .is_determined(Category::Runtime)
}
