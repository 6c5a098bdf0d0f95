//! Cancellation and deadline context shared by one detection run.
//!
//! A `Context` is cheap to clone; clones observe the same cancellation flag.
//! Child contexts created with [`Context::with_timeout`] tighten the deadline
//! and can be cancelled on their own without affecting the parent, while
//! cancelling the parent is visible through every child.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::DetectError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct Inner {
    /// Absolute deadline, already folded with the parent's
    deadline: Option<Instant>,

    /// Explicit cancellation for this context only
    cancelled: AtomicBool,

    parent: Option<Context>,
}

#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::build(None, None)
    }

    /// A root context that expires `timeout` from now.
    pub fn timeout(timeout: Duration) -> Self {
        Self::build(Instant::now().checked_add(timeout), None)
    }

    /// A root context that expires at `deadline`.
    pub fn deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline), None)
    }

    /// Derive a child whose deadline is the tighter of this context's deadline
    /// and `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now().checked_add(timeout);
        let deadline = match (self.inner.deadline, own) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };
        Self::build(deadline, Some(self.clone()))
    }

    fn build(deadline: Option<Instant>, parent: Option<Context>) -> Self {
        Self {
            inner: Arc::new(Inner {
                deadline,
                cancelled: AtomicBool::new(false),
                parent,
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn deadline_at(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Clamp an operation timeout so it never outlives this context.
    pub fn bound(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => remaining.min(timeout),
            None => timeout,
        }
    }

    /// Returns the reason this context is done, if it is.
    ///
    /// Explicit cancellation anywhere in the chain takes precedence over an
    /// elapsed deadline.
    pub fn check(&self) -> Result<(), DetectError> {
        if self.is_cancelled() {
            return Err(DetectError::Cancelled);
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return Err(DetectError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(|parent| parent.is_cancelled())
    }

    /// Sleep for up to `duration`, waking early when the context is done.
    ///
    /// A duration too large to represent as an instant sleeps until the
    /// context ends.
    pub fn sleep(&self, duration: Duration) -> Result<(), DetectError> {
        let until = Instant::now().checked_add(duration);
        loop {
            self.check()?;
            let step = match until {
                Some(until) => {
                    let now = Instant::now();
                    if now >= until {
                        return Ok(());
                    }
                    POLL_INTERVAL.min(until - now)
                }
                None => POLL_INTERVAL,
            };
            thread::sleep(step);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
