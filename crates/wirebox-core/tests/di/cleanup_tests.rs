//! Cleanup registry: late binding against final values, enhancer-plugin
//! teardowns, and settle-all failure aggregation.

use super::register_renderer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wirebox_core::App;
use wirebox_domain::{BoundValue, Error, Plugin, Token};

#[tokio::test]
async fn cleanup_reads_the_final_enhanced_value() {
    let mut app = App::new();
    let token = Token::new("CleanedUp");

    let seen = Arc::new(Mutex::new(None::<u32>));
    let sink = seen.clone();
    let plugin = Plugin::builder()
        .provides_value(1u32)
        .cleanup(move |value| {
            let sink = sink.clone();
            Box::pin(async move {
                *sink.lock().unwrap() = value.and_then(|v| v.downcast::<u32>().ok()).map(|v| *v);
                Ok(())
            })
        })
        .build();
    app.register(&token, plugin);
    app.enhance(&token, |value| {
        BoundValue::value(*value.unwrap().downcast::<u32>().unwrap() * 10)
    });
    register_renderer(&mut app);

    app.resolve().unwrap();
    app.cleanup().await.unwrap();

    // The teardown saw the post-enhancer value, not the plugin's own output.
    assert_eq!(*seen.lock().unwrap(), Some(10));
}

#[tokio::test]
async fn enhancer_produced_plugins_register_their_own_cleanup() {
    let mut app = App::new();
    let token = Token::new("EnhancedWithCleanup");
    app.register(&token, BoundValue::value(0u8));

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    app.enhance(&token, move |_value| {
        let counter = counter.clone();
        BoundValue::from(
            Plugin::builder()
                .provides_value(1u8)
                .cleanup(move |_value| {
                    let counter = counter.clone();
                    Box::pin(async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                })
                .build(),
        )
    });
    register_renderer(&mut app);

    app.resolve().unwrap();
    app.cleanup().await.unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_teardown_does_not_stop_the_others() {
    let mut app = App::new();

    let failing = Token::new("FailingTeardown");
    app.register(
        &failing,
        Plugin::builder()
            .provides_value(())
            .cleanup(|_value| {
                Box::pin(async { Err(Error::invalid_registration("teardown exploded")) })
            })
            .build(),
    );

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let surviving = Token::new("SurvivingTeardown");
    app.register(
        &surviving,
        Plugin::builder()
            .provides_value(())
            .cleanup(move |_value| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .build(),
    );
    register_renderer(&mut app);

    app.resolve().unwrap();
    let err = app.cleanup().await.unwrap_err();
    assert!(err.to_string().contains("teardown exploded"));
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}
