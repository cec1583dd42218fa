//! Failure diagnostics: cycles, missing registrations with reverse-dependency
//! reporting, and duplicate-name ambiguity.

use super::register_renderer;
use std::sync::Arc;
use wirebox_core::App;
use wirebox_domain::{BoundValue, Error, Plugin, ServiceValue, Token};

#[test]
fn circular_dependencies_are_detected() {
    let mut app = App::new();
    let a = Token::new("A");
    let b = Token::new("B");
    app.register(&a, Plugin::builder().dep("b", &b).build());
    app.register(&b, Plugin::builder().dep("a", &a).build());
    register_renderer(&mut app);

    let err = app.resolve().unwrap_err();
    match err {
        Error::CircularDependency {
            token, location, ..
        } => {
            assert!(token == "A" || token == "B", "unexpected token {token}");
            assert!(location.is_some(), "cycle should point at a registration");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_registration_lists_every_dependent() {
    let mut app = App::new();
    let z = Token::new("Z");
    for name in ["M", "N"] {
        let token = Token::new(name);
        app.register(&token, Plugin::builder().dep("z", &z).build());
    }
    register_renderer(&mut app);

    let err = app.resolve().unwrap_err();
    match err {
        Error::MissingRegistration {
            token,
            dependents,
            ref message,
            ..
        } => {
            assert_eq!(token, "Z");
            assert_eq!(dependents, ["M", "N"]);
            assert!(message.contains("plugins"), "expected plural: {message}");
            assert!(message.contains("\"M\", \"N\""));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn single_dependent_is_reported_singular() {
    let mut app = App::new();
    let z = Token::new("LonelyZ");
    let m = Token::new("OnlyDependent");
    app.register(&m, Plugin::builder().dep("z", &z).build());
    register_renderer(&mut app);

    let err = app.resolve().unwrap_err();
    match err {
        Error::MissingRegistration {
            dependents,
            ref message,
            ..
        } => {
            assert_eq!(dependents, ["OnlyDependent"]);
            assert!(
                !message.contains("plugins"),
                "expected singular: {message}"
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_token_names_are_called_out_as_ambiguity() {
    let mut app = App::new();
    let registered = Token::new("Dup");
    app.register(&registered, BoundValue::value(1u32));

    let unregistered = Token::new("Dup");
    let consumer = Token::new("DupConsumer");
    app.register(&consumer, Plugin::builder().dep("dup", &unregistered).build());
    register_renderer(&mut app);

    let err = app.resolve().unwrap_err();
    match err {
        Error::AmbiguousTokenName { token, .. } => assert_eq!(token, "Dup"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn enhancer_dependents_are_reported_with_their_owner() {
    let mut app = App::new();
    let base = Token::new("Base");
    app.register(&base, BoundValue::value(0u8));

    let z = Token::new("WantedByEnhancer");
    let dep = z.clone();
    app.enhance(&base, move |_value| {
        BoundValue::from(
            Plugin::builder()
                .dep("z", &dep)
                .provides(|_| Arc::new(()) as ServiceValue)
                .build(),
        )
    });
    register_renderer(&mut app);

    let err = app.resolve().unwrap_err();
    match err {
        Error::MissingRegistration {
            token, dependents, ..
        } => {
            assert_eq!(token, "WantedByEnhancer");
            assert_eq!(dependents, ["EnhancerOf<Base>"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn diagnostics_carry_stable_categories() {
    let mut app = App::new();
    let a = Token::new("CatA");
    let b = Token::new("CatB");
    app.register(&a, Plugin::builder().dep("b", &b).build());
    app.register(&b, Plugin::builder().dep("a", &a).build());
    register_renderer(&mut app);

    assert_eq!(app.resolve().unwrap_err().category(), "circular-dependencies");
}
