mod fixtures;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criprof::testing::{BlockingProbe, ExecutionLog, FixedIdentity, ScriptedProbe};
use criprof::{Category, Context, DetectError, Engine, EngineConfig, Evidence, Probe, ProbeResult};
use pretty_assertions::assert_eq;

use fixtures::{fixed_identity, undetermined};

#[test]
fn test_probes_run_by_descending_priority() {
    let log = ExecutionLog::new();
    let engine = Engine::builder()
        .without_caching()
        .with_probe(ScriptedProbe::absent("low", 10).with_log(&log))
        .with_probe(ScriptedProbe::absent("high-first", 90).with_log(&log))
        .with_probe(ScriptedProbe::absent("mid", 50).with_log(&log))
        .with_probe(ScriptedProbe::absent("high-second", 90).with_log(&log))
        .build();

    engine.detect_all(&Context::background()).unwrap();

    assert_eq!(log.names(), vec!["high-first", "high-second", "mid", "low"]);
    assert_eq!(engine.probe_names(), log.names());
}

#[test]
fn test_higher_confidence_wins() {
    let engine = Engine::builder()
        .without_caching()
        .with_identity(fixed_identity())
        .with_probe(ScriptedProbe::found("a", 90, Category::Runtime, "x", 0.5))
        .with_probe(ScriptedProbe::found("b", 10, Category::Runtime, "y", 0.9))
        .build();

    let inventory = engine.detect_all(&Context::background()).unwrap();
    assert_eq!(inventory.runtime, "y");
}

#[test]
fn test_confidence_tie_goes_to_earlier_probe() {
    let engine = Engine::builder()
        .without_caching()
        .with_probe(ScriptedProbe::found("later", 40, Category::Scheduler, "nomad", 0.95))
        .with_probe(ScriptedProbe::found("earlier", 80, Category::Scheduler, "kubernetes", 0.95))
        .build();

    let inventory = engine.detect_all(&Context::background()).unwrap();
    assert_eq!(inventory.scheduler, "kubernetes");
}

#[test]
fn test_equal_priority_tie_keeps_registration_order() {
    let engine = Engine::builder()
        .without_caching()
        .with_probe(ScriptedProbe::found("first", 50, Category::ImageFormat, "oci", 0.8))
        .with_probe(ScriptedProbe::found("second", 50, Category::ImageFormat, "docker", 0.8))
        .build();

    let inventory = engine.detect_all(&Context::background()).unwrap();
    assert_eq!(inventory.image_format, "oci");
}

#[test]
fn test_empty_roster() {
    let engine = Engine::builder().with_identity(fixed_identity()).build();
    let inventory = engine.detect_all(&Context::background()).unwrap();
    assert_eq!(inventory, undetermined("fixture-host"));
    assert_eq!(inventory.pid, std::process::id());
}

#[test]
fn test_empty_roster_with_system_identity() {
    let engine = Engine::new(EngineConfig::new(Vec::new()));
    let inventory = engine.detect_all(&Context::background()).unwrap();
    assert!(!inventory.hostname.is_empty());
    assert_eq!(inventory.pid, std::process::id());
    for category in Category::ALL {
        assert_eq!(inventory.get(category), "undetermined");
    }
}

#[test]
fn test_hostname_failure_degrades_to_unknown() {
    let engine = Engine::builder()
        .with_identity(Arc::new(FixedIdentity::new().without_hostname()))
        .build();
    let inventory = engine.detect_all(&Context::background()).unwrap();
    assert_eq!(inventory.hostname, "unknown");
}

#[test]
fn test_cached_calls_are_identical_and_skip_probes() {
    let probe = ScriptedProbe::found("a", 1, Category::Runtime, "docker", 0.95);
    let calls = probe.calls();
    let engine = Engine::builder().with_probe(probe).build();

    let first = engine.detect_all(&Context::background()).unwrap();
    let second = engine.detect_all(&Context::background()).unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_expired_cache_reruns_every_probe_once() {
    let a = ScriptedProbe::absent("a", 2);
    let b = ScriptedProbe::absent("b", 1);
    let (a_calls, b_calls) = (a.calls(), b.calls());
    let engine = Engine::builder()
        .with_caching(Duration::from_millis(150))
        .with_probe(a)
        .with_probe(b)
        .build();

    for _ in 0..3 {
        engine.detect_all(&Context::background()).unwrap();
    }
    assert_eq!(a_calls.get(), 1);
    assert_eq!(b_calls.get(), 1);

    thread::sleep(Duration::from_millis(200));
    engine.detect_all(&Context::background()).unwrap();
    engine.detect_all(&Context::background()).unwrap();

    assert_eq!(a_calls.get(), 2);
    assert_eq!(b_calls.get(), 2);
}

#[test]
fn test_invalidate_forces_rerun() {
    let probe = ScriptedProbe::absent("a", 1);
    let calls = probe.calls();
    let engine = Engine::builder().with_probe(probe).build();

    engine.detect_all(&Context::background()).unwrap();
    engine.invalidate_cache();
    engine.detect_all(&Context::background()).unwrap();

    assert_eq!(calls.get(), 2);
}

#[test]
fn test_caching_disabled_reruns_roster() {
    let probe = ScriptedProbe::absent("a", 1);
    let calls = probe.calls();
    let engine = Engine::builder().without_caching().with_probe(probe).build();

    for _ in 0..3 {
        engine.detect_all(&Context::background()).unwrap();
    }
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_probe_failure_is_absorbed() {
    let engine = Engine::builder()
        .without_caching()
        .with_probe(ScriptedProbe::failing("broken", 90))
        .with_probe(ScriptedProbe::found("ok", 10, Category::Runtime, "podman", 0.7))
        .build();

    let inventory = engine.detect_all(&Context::background()).unwrap();
    assert_eq!(inventory.runtime, "podman");
}

#[test]
fn test_blocking_probe_hits_deadline() {
    let after = ScriptedProbe::absent("after", 1);
    let after_calls = after.calls();
    let engine = Engine::builder()
        .with_probe(BlockingProbe::new(50))
        .with_probe(after)
        .build();

    let started = Instant::now();
    let result = engine.detect_all(&Context::timeout(Duration::from_millis(50)));

    assert_eq!(result, Err(DetectError::DeadlineExceeded));
    assert!(started.elapsed() < Duration::from_millis(550));
    assert_eq!(after_calls.get(), 0);
}

/// Sleeps without looking at the context, then reports docker.
struct SlowMarker {
    delay: Duration,
}

impl Probe for SlowMarker {
    fn name(&self) -> &'static str {
        "slow-marker"
    }

    fn priority(&self) -> i32 {
        1
    }

    fn execute(&self, _ctx: &Context) -> ProbeResult {
        thread::sleep(self.delay);
        Ok(Some(Evidence::new(
            Category::Runtime,
            "docker",
            0.95,
            self.name(),
        )))
    }
}

#[test]
fn test_deadline_passing_during_last_step_yields_error() {
    let engine = Engine::builder()
        .with_identity(fixed_identity())
        .with_probe(SlowMarker {
            delay: Duration::from_millis(150),
        })
        .build();

    let result = engine.detect_all(&Context::timeout(Duration::from_millis(20)));
    assert_eq!(result, Err(DetectError::DeadlineExceeded));

    // nothing was cached, so a cancelled context gets no record either
    let ctx = Context::background();
    ctx.cancel();
    assert_eq!(engine.detect_all(&ctx), Err(DetectError::Cancelled));
}

#[test]
fn test_cancel_from_another_thread() {
    let engine = Engine::builder().with_probe(BlockingProbe::new(1)).build();
    let ctx = Context::background();

    let canceller = {
        let ctx = ctx.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            ctx.cancel();
        })
    };

    assert_eq!(engine.detect_all(&ctx), Err(DetectError::Cancelled));
    canceller.join().unwrap();
}

#[test]
fn test_cancelled_context_runs_no_probes() {
    let probe = ScriptedProbe::absent("a", 1);
    let calls = probe.calls();
    let engine = Engine::builder().with_probe(probe).build();

    let ctx = Context::background();
    ctx.cancel();

    assert_eq!(engine.detect_all(&ctx), Err(DetectError::Cancelled));
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_cancellation_error_from_probe_aborts_and_skips_cache() {
    let probe = ScriptedProbe::cancelling("stopper", 90, DetectError::Cancelled);
    let calls = probe.calls();
    let engine = Engine::builder()
        .with_probe(probe)
        .with_probe(ScriptedProbe::found("ok", 10, Category::Runtime, "docker", 0.95))
        .build();

    assert_eq!(
        engine.detect_all(&Context::background()),
        Err(DetectError::Cancelled)
    );
    assert_eq!(
        engine.detect_all(&Context::background()),
        Err(DetectError::Cancelled)
    );
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_concurrent_callers_share_one_record() {
    let engine = Arc::new(
        Engine::builder()
            .with_identity(fixed_identity())
            .with_probe(ScriptedProbe::found("a", 1, Category::Runtime, "docker", 0.95))
            .build(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.detect_all(&Context::background()).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().runtime, "docker");
    }
}
