//! Middleware timing wrapper
//!
//! Pure decorator over a resolved middleware, installed only when the timing
//! flag token is registered. Measures the downstream leg (middleware entry up
//! to handing off to `next`) and the upstream leg (`next` completing up to
//! middleware return) and pushes a [`MiddlewareTiming`] record into the
//! request context's collector, tagged with the owning token's name and its
//! rendered debug sources. Contexts without a collector are passed through
//! untouched.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wirebox_domain::{Context, Middleware, MiddlewareTiming, Next, Token};

const MS_PER_SEC: f64 = 1_000.0;

/// Render a token's debug log as a JSON array of `{phase, source}` entries.
fn render_sources(token: &Token) -> String {
    let entries: Vec<_> = token
        .debug_log()
        .iter()
        .map(|entry| {
            serde_json::json!({
                "phase": entry.phase,
                "source": entry.source.to_string(),
            })
        })
        .collect();
    serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
}

/// Wrap `inner` so each invocation records downstream/upstream timings into
/// the request's timing collector.
pub(crate) fn wrap_middleware(inner: Middleware, token: &Token) -> Middleware {
    let token_name = token.name().to_string();
    let source = render_sources(token);

    Arc::new(move |ctx: Context, next: Next| {
        let inner = inner.clone();
        let token_name = token_name.clone();
        let source = source.clone();
        Box::pin(async move {
            let Some(collector) = ctx.timing().cloned() else {
                return inner(ctx, next).await;
            };

            let downstream_start = Instant::now();
            let downstream = Arc::new(Mutex::new(None::<Duration>));
            let upstream_start = Arc::new(Mutex::new(None::<Instant>));

            let downstream_cell = downstream.clone();
            let upstream_cell = upstream_start.clone();
            let wrapped_next: Next = Box::new(move || {
                Box::pin(async move {
                    *downstream_cell
                        .lock()
                        .expect("timing cell lock poisoned") = Some(downstream_start.elapsed());
                    next().await?;
                    *upstream_cell.lock().expect("timing cell lock poisoned") =
                        Some(Instant::now());
                    Ok(())
                })
            });

            // The record is pushed whether or not the middleware succeeded;
            // an erroring middleware still leaves its entry, with -1
            // sentinels for any leg that never ran.
            let result = inner(ctx, wrapped_next).await;

            let downstream_ms = downstream
                .lock()
                .expect("timing cell lock poisoned")
                .map_or(-1.0, |elapsed| elapsed.as_secs_f64() * MS_PER_SEC);
            let upstream_ms = upstream_start
                .lock()
                .expect("timing cell lock poisoned")
                .map_or(-1.0, |start| start.elapsed().as_secs_f64() * MS_PER_SEC);

            collector.push(MiddlewareTiming {
                token: token_name.clone(),
                source: source.clone(),
                downstream_ms,
                upstream_ms,
            });
            result
        })
    })
}
