//! Plugin shape
//!
//! A [`Plugin`] is the unit of registration: a map of declared dependencies
//! (local name → token), an optional `provides` builder producing the token's
//! service, an optional `middleware` builder contributing to the request
//! chain, and an optional async `cleanup`. A plugin with none of the three is
//! inert but legal.
//!
//! Tokens are identity-only, so resolved services are dynamically typed:
//! [`ServiceValue`] is an `Arc<dyn Any>` and consumers downcast at the edge
//! via [`ResolvedDeps::get`]. Presence and identity are checked by the engine;
//! types are not.

use crate::error::Result;
use crate::middleware::Middleware;
use crate::source::DebugSource;
use crate::token::Token;
use futures::future::BoxFuture;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A resolved service instance. Dynamically typed; downcast at the edge.
pub type ServiceValue = Arc<dyn Any + Send + Sync>;

/// Builder producing a service from the plugin's resolved dependencies.
pub type ProvidesFn = Box<dyn Fn(&ResolvedDeps) -> ServiceValue + Send + Sync>;

/// Builder producing request middleware from the resolved dependencies and
/// the value `provides` produced (if any).
pub type MiddlewareBuilder =
    Box<dyn Fn(&ResolvedDeps, Option<&ServiceValue>) -> Middleware + Send + Sync>;

/// Teardown callback. Receives the token's final resolved value, i.e. the
/// value after every enhancer has run.
pub type CleanupFn = Arc<dyn Fn(Option<ServiceValue>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A function wrapping or replacing a token's resolved value after its
/// original resolution. May return a plugin, which re-enters plugin
/// resolution and can contribute new middleware or dependencies.
pub type Enhancer = Box<dyn Fn(Option<ServiceValue>) -> BoundValue + Send + Sync>;

/// Dependencies resolved for one plugin invocation, keyed by the plugin's
/// local dependency names. Optional dependencies that were never registered
/// appear as `None`.
#[derive(Default)]
pub struct ResolvedDeps {
    values: BTreeMap<String, Option<ServiceValue>>,
}

impl ResolvedDeps {
    /// Record a resolved dependency under its local name.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<ServiceValue>) {
        self.values.insert(name.into(), value);
    }

    /// Raw dynamic value for `name`; `None` if absent or undeclared.
    pub fn raw(&self, name: &str) -> Option<&ServiceValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// Downcast the dependency named `name` to `T`. `None` if the dependency
    /// is absent or holds another type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.raw(name).cloned().and_then(|value| value.downcast::<T>().ok())
    }
}

impl fmt::Debug for ResolvedDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(k, v)| (k, v.is_some())))
            .finish()
    }
}

/// What a token is bound to: a plain value or a plugin. The explicit tag is
/// what `register` checks; there is no duck typing.
pub enum BoundValue {
    /// A plain service value, resolved as-is
    Value(ServiceValue),
    /// A plugin, invoked during the resolution walk
    Plugin(Plugin),
}

impl BoundValue {
    /// Wrap a plain value for registration.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(Arc::new(value))
    }

    /// True if the bound value carries the plugin tag.
    pub fn is_plugin(&self) -> bool {
        matches!(self, Self::Plugin(_))
    }
}

impl From<Plugin> for BoundValue {
    fn from(plugin: Plugin) -> Self {
        Self::Plugin(plugin)
    }
}

impl From<ServiceValue> for BoundValue {
    fn from(value: ServiceValue) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("BoundValue::Value"),
            Self::Plugin(plugin) => f.debug_tuple("BoundValue::Plugin").field(plugin).finish(),
        }
    }
}

/// A registered unit bundling declared dependencies, an optional provided
/// value, optional middleware, and optional cleanup.
pub struct Plugin {
    deps: BTreeMap<String, Token>,
    provides: Option<ProvidesFn>,
    middleware: Option<MiddlewareBuilder>,
    cleanup: Option<CleanupFn>,
    source: DebugSource,
}

impl Plugin {
    /// Start building a plugin. The creation call site is captured for
    /// diagnostics.
    #[track_caller]
    pub fn builder() -> PluginBuilder {
        PluginBuilder {
            deps: BTreeMap::new(),
            provides: None,
            middleware: None,
            cleanup: None,
            source: DebugSource::capture(),
        }
    }

    /// Declared dependencies, local name → token.
    pub fn deps(&self) -> &BTreeMap<String, Token> {
        &self.deps
    }

    /// Where the plugin was built.
    pub fn source(&self) -> DebugSource {
        self.source
    }

    /// Invoke `provides` with the resolved dependencies, if present.
    pub fn provide(&self, deps: &ResolvedDeps) -> Option<ServiceValue> {
        self.provides.as_ref().map(|provides| provides(deps))
    }

    /// Invoke the middleware builder, if present.
    pub fn build_middleware(
        &self,
        deps: &ResolvedDeps,
        provides: Option<&ServiceValue>,
    ) -> Option<Middleware> {
        self.middleware
            .as_ref()
            .map(|middleware| middleware(deps, provides))
    }

    /// Shared handle to the cleanup callback, if present.
    pub fn cleanup_fn(&self) -> Option<CleanupFn> {
        self.cleanup.clone()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("deps", &self.deps.keys().collect::<Vec<_>>())
            .field("provides", &self.provides.is_some())
            .field("middleware", &self.middleware.is_some())
            .field("cleanup", &self.cleanup.is_some())
            .field("source", &self.source)
            .finish()
    }
}

/// Builder for [`Plugin`].
pub struct PluginBuilder {
    deps: BTreeMap<String, Token>,
    provides: Option<ProvidesFn>,
    middleware: Option<MiddlewareBuilder>,
    cleanup: Option<CleanupFn>,
    source: DebugSource,
}

impl PluginBuilder {
    /// Declare a dependency under a local name. Local names are unique per
    /// plugin; redeclaring a name replaces the earlier token.
    pub fn dep(mut self, name: impl Into<String>, token: &Token) -> Self {
        self.deps.insert(name.into(), token.clone());
        self
    }

    /// Produce the plugin's service from its resolved dependencies.
    pub fn provides<F>(mut self, provides: F) -> Self
    where
        F: Fn(&ResolvedDeps) -> ServiceValue + Send + Sync + 'static,
    {
        self.provides = Some(Box::new(provides));
        self
    }

    /// Provide a constant value, ignoring dependencies.
    pub fn provides_value<T: Any + Send + Sync>(self, value: T) -> Self {
        let value: ServiceValue = Arc::new(value);
        self.provides(move |_| value.clone())
    }

    /// Contribute request middleware built from the resolved dependencies and
    /// the provided value.
    pub fn middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(&ResolvedDeps, Option<&ServiceValue>) -> Middleware + Send + Sync + 'static,
    {
        self.middleware = Some(Box::new(middleware));
        self
    }

    /// Register an async teardown, handed the token's final resolved value at
    /// shutdown.
    pub fn cleanup<F>(mut self, cleanup: F) -> Self
    where
        F: Fn(Option<ServiceValue>) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        self.cleanup = Some(Arc::new(cleanup));
        self
    }

    /// Finish the plugin.
    pub fn build(self) -> Plugin {
        Plugin {
            deps: self.deps,
            provides: self.provides,
            middleware: self.middleware,
            cleanup: self.cleanup,
            source: self.source,
        }
    }
}
