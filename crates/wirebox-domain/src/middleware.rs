//! Request middleware types
//!
//! Middleware runs as an onion: each function receives the request [`Context`]
//! and a [`Next`] continuation for everything downstream of it. Work before
//! `next().await` happens on the way in, work after it on the way out. The
//! engine assembles the chain at resolve time; hosts drive it per request via
//! [`compose`].
//!
//! The context also carries the optional request-scoped [`TimingCollector`]
//! the timing wrapper writes into. With no collector attached, timing records
//! are silently dropped.

use crate::error::Result;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Continuation invoking the rest of the middleware chain.
pub type Next = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// A request middleware: wraps everything downstream of it.
pub type Middleware = Arc<dyn Fn(Context, Next) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Per-request context threaded through the middleware chain. Cheap to clone;
/// clones share the timing collector.
#[derive(Clone, Default)]
pub struct Context {
    timing: Option<TimingCollector>,
}

impl Context {
    /// Context without timing collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with a fresh request-scoped timing collector attached.
    pub fn with_timing() -> Self {
        Self {
            timing: Some(TimingCollector::default()),
        }
    }

    /// The request's timing collector, if one is attached.
    pub fn timing(&self) -> Option<&TimingCollector> {
        self.timing.as_ref()
    }
}

/// One middleware's per-request timing record.
#[derive(Debug, Clone, Serialize)]
pub struct MiddlewareTiming {
    /// Display name of the token that owns the middleware
    pub token: String,
    /// The owning token's debug sources, rendered as JSON
    pub source: String,
    /// Milliseconds from middleware entry to handing off to `next`.
    /// -1 if the middleware never invoked `next`.
    pub downstream_ms: f64,
    /// Milliseconds from `next` completing to middleware return.
    /// -1 if the middleware never invoked `next`.
    pub upstream_ms: f64,
}

/// Request-scoped sink for middleware timing records.
#[derive(Clone, Default)]
pub struct TimingCollector {
    records: Arc<Mutex<Vec<MiddlewareTiming>>>,
}

impl TimingCollector {
    /// Append a record.
    pub fn push(&self, timing: MiddlewareTiming) {
        self.records
            .lock()
            .expect("timing collector lock poisoned")
            .push(timing);
    }

    /// Snapshot of all records collected so far.
    pub fn records(&self) -> Vec<MiddlewareTiming> {
        self.records
            .lock()
            .expect("timing collector lock poisoned")
            .clone()
    }
}

/// A `Next` that does nothing, for driving a chain with no downstream tail.
pub fn noop_next() -> Next {
    Box::new(|| Box::pin(async { Ok(()) }))
}

/// Compose `chain` into a single middleware that runs the slice as an onion:
/// the first element wraps everything after it, and the composed middleware's
/// own `next` runs after the whole slice.
pub fn compose(chain: &[Middleware]) -> Middleware {
    let chain: Arc<[Middleware]> = chain.iter().cloned().collect();
    Arc::new(move |ctx, next| dispatch(chain.clone(), 0, ctx, next))
}

fn dispatch(
    chain: Arc<[Middleware]>,
    index: usize,
    ctx: Context,
    tail: Next,
) -> BoxFuture<'static, Result<()>> {
    match chain.get(index).cloned() {
        None => tail(),
        Some(middleware) => {
            let rest = chain.clone();
            let next_ctx = ctx.clone();
            let next: Next = Box::new(move || dispatch(rest, index + 1, next_ctx, tail));
            middleware(ctx, next)
        }
    }
}
