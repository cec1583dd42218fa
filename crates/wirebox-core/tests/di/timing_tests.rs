//! Middleware timing wrapper: toggled by the flag token, transparent to
//! functional behavior.

use super::{init_tracing, marker_middleware, register_renderer};
use std::sync::{Arc, Mutex};
use wirebox_core::{App, enable_middleware_timing_token};
use wirebox_domain::{BoundValue, Context, Error, Middleware, Next};

fn app_with_middleware(log: &Arc<Mutex<Vec<String>>>, timing: bool) -> App {
    let mut app = App::new();
    if timing {
        app.register(enable_middleware_timing_token(), BoundValue::value(true));
    }
    for name in ["a", "b"] {
        let log = log.clone();
        app.middleware(&[], move |_deps| marker_middleware(&log, name))
            .unwrap();
    }
    register_renderer(&mut app);
    app
}

#[tokio::test]
async fn flag_unregistered_installs_unwrapped_middleware() {
    init_tracing();
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = app_with_middleware(&log, false);
    app.resolve().unwrap();

    let ctx = Context::with_timing();
    app.handle(ctx.clone()).await.unwrap();

    assert!(ctx.timing().unwrap().records().is_empty());
    assert_eq!(
        log.lock().unwrap().as_slice(),
        ["a:down", "b:down", "b:up", "a:up"]
    );
}

#[tokio::test]
async fn flag_registered_records_timings_without_changing_behavior() {
    init_tracing();
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = app_with_middleware(&log, true);
    app.resolve().unwrap();

    let ctx = Context::with_timing();
    app.handle(ctx.clone()).await.unwrap();

    // Functional behavior matches the unwrapped run exactly.
    assert_eq!(
        log.lock().unwrap().as_slice(),
        ["a:down", "b:down", "b:up", "a:up"]
    );

    let records = ctx.timing().unwrap().records();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.token, "UnnamedPlugin");
        assert!(record.source.contains("registered"));
        assert!(record.downstream_ms >= 0.0);
        assert!(record.upstream_ms >= 0.0);
    }
}

#[tokio::test]
async fn erroring_middleware_still_leaves_a_timing_record() {
    init_tracing();
    let mut app = App::new();
    app.register(enable_middleware_timing_token(), BoundValue::value(true));
    app.middleware(&[], |_deps| {
        let failing: Middleware = Arc::new(|_ctx, _next: Next| {
            Box::pin(async { Err(Error::invalid_registration("handler failed")) })
        });
        failing
    })
    .unwrap();
    register_renderer(&mut app);
    app.resolve().unwrap();

    let ctx = Context::with_timing();
    assert!(app.handle(ctx.clone()).await.is_err());

    let records = ctx.timing().unwrap().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].downstream_ms, -1.0);
    assert_eq!(records[0].upstream_ms, -1.0);
}

#[tokio::test]
async fn wrapped_middleware_without_collector_still_serves() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = app_with_middleware(&log, true);
    app.resolve().unwrap();

    app.handle(Context::new()).await.unwrap();
    assert_eq!(log.lock().unwrap().len(), 4);
}
