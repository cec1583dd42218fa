//! DI engine integration tests
//!
//! Shared helpers for the resolution, diagnostics, timing and cleanup suites.

pub mod cleanup_tests;
pub mod diagnostics_tests;
pub mod timing_tests;

use std::sync::{Arc, Mutex, Once};
use wirebox_core::{App, render_token};
use wirebox_domain::{BoundValue, Middleware, Next};

static TRACING: Once = Once::new();

/// Install a test log subscriber once; later calls are no-ops.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Middleware logging `{name}:down` on the way in and `{name}:up` on the way
/// out.
pub fn marker_middleware(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Middleware {
    let log = log.clone();
    Arc::new(move |_ctx, next: Next| {
        let log = log.clone();
        Box::pin(async move {
            log.lock().unwrap().push(format!("{name}:down"));
            next().await?;
            log.lock().unwrap().push(format!("{name}:up"));
            Ok(())
        })
    })
}

/// Register a plain-value renderer; resolution requires one.
pub fn register_renderer(app: &mut App) {
    app.register(render_token(), BoundValue::value("renderer"));
}
