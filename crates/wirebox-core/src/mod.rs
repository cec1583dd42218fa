//! wirebox DI engine
//!
//! Registrations accumulate against opaque identity tokens, then a single
//! `resolve` pass walks the dependency graph depth-first (memoized,
//! cycle-checked) to produce the wired service set and the ordered request
//! middleware chain.
//!
//! ## Architecture
//!
//! ```text
//! register / enhance / alias          resolve()                 per request
//!          │                              │                          │
//!          ▼                              ▼                          ▼
//! ┌────────────────────┐    ┌──────────────────────────┐    ┌────────────────┐
//! │ RegistrationStore  │ →  │ Resolver (DFS + memo +   │ →  │ middleware     │
//! │ token → {value,    │    │ cycle sentinel + alias   │    │ chain, renderer│
//! │ aliases, enhancers}│    │ scoping + diagnostics)   │    │ last           │
//! └────────────────────┘    └──────────────────────────┘    └────────────────┘
//! ```
//!
//! Strict two-phase contract: configure, then resolve once, then serve.
//! Every resolution failure is terminal; DI wiring errors are configuration
//! errors meant to be fixed before deployment.

/// The engine: registration API, resolve orchestration, service lookup
pub mod app;
/// Well-known engine tokens (renderer, timing flag)
pub mod tokens;

mod cleanup;
mod registry;
mod resolver;
mod timing;

pub use app::{AliasHandle, App};
pub use tokens::{enable_middleware_timing_token, render_token};
