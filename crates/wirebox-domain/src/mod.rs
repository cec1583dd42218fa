//! Domain types for the wirebox dependency injection engine
//!
//! This crate holds the vocabulary the engine crate (`wirebox-core`) is built
//! from, with no wiring logic of its own:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Token`] | Opaque, identity-compared handle naming a dependency slot |
//! | [`DebugSource`] | Captured call site used in failure diagnostics |
//! | [`Plugin`] | Registered unit bundling deps, provides, middleware, cleanup |
//! | [`BoundValue`] | Tagged union of plain values and plugins |
//! | [`Middleware`] | Onion-model request middleware over a [`Context`] |
//! | [`Error`] | Fatal configuration/resolution error taxonomy |

/// Error taxonomy for registration and resolution failures
pub mod error;
/// Request middleware types and chain composition
pub mod middleware;
/// Plugin shape: declared deps, provides, middleware, cleanup
pub mod plugin;
/// Call-site capture for diagnostics
pub mod source;
/// Identity tokens and their debug logs
pub mod token;

// Re-export the common surface
pub use error::{Error, Result};
pub use middleware::{Context, Middleware, MiddlewareTiming, Next, TimingCollector, compose, noop_next};
pub use plugin::{BoundValue, CleanupFn, Enhancer, Plugin, PluginBuilder, ResolvedDeps, ServiceValue};
pub use source::DebugSource;
pub use token::{DebugEntry, Token, TokenId, TokenKind, TokenPhase};
