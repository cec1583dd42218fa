//! The engine
//!
//! [`App`] is the composition root: registrations accumulate against tokens
//! during the configure phase, [`App::resolve`] performs the single graph
//! walk, and afterwards [`App::service`] serves memoized lookups while
//! [`App::middleware_chain`] exposes the assembled request chain (renderer
//! last). [`App::cleanup`] runs the teardowns queued during the walk.
//!
//! The store and resolution state are owned exclusively by one `App`; the
//! whole registration+resolve sequence must complete before any concurrent
//! request serving begins.

use crate::cleanup::CleanupRegistry;
use crate::registry::RegistrationStore;
use crate::resolver::{ResolutionState, Resolver};
use crate::tokens;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use wirebox_domain::{
    BoundValue, Context, DebugSource, Error, Middleware, Plugin, ResolvedDeps, Result,
    ServiceValue, Token, TokenId, TokenPhase, compose, noop_next,
};

/// Token registry + recursive resolution engine.
#[derive(Default)]
pub struct App {
    store: RegistrationStore,
    /// The renderer registration, held apart so it always resolves last.
    renderer: Option<BoundValue>,
    /// True once the renderer moved into the store. A failed walk leaves it
    /// bound, so a retried resolve rediscovers the original failure instead
    /// of misreporting a missing renderer.
    renderer_bound: bool,
    cleanups: CleanupRegistry,
    middleware_chain: Vec<Middleware>,
    /// Memo table from the resolve walk; `Some` once resolution completed.
    services: Option<HashMap<TokenId, Option<ServiceValue>>>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `token`. Returns a handle scoping subsequent
    /// [`AliasHandle::alias`] calls to this registration's dependency
    /// resolution.
    ///
    /// Re-registering a token overwrites the bound value but keeps aliases
    /// and enhancers already accumulated for it.
    #[track_caller]
    pub fn register(&mut self, token: &Token, value: impl Into<BoundValue>) -> AliasHandle<'_> {
        let source = DebugSource::capture();
        self.register_inner(token.clone(), value.into(), source)
    }

    /// Register a plugin without a token; an unnamed token is generated for
    /// it. Registering a bare value this way is an
    /// [`Error::InvalidRegistration`].
    #[track_caller]
    pub fn register_plugin(&mut self, value: impl Into<BoundValue>) -> Result<AliasHandle<'_>> {
        let source = DebugSource::capture();
        let value = value.into();
        if !value.is_plugin() {
            return Err(Error::invalid_registration(
                "cannot register a bare value without a token; only plugins may be registered tokenless",
            ));
        }
        let token = Token::new("UnnamedPlugin");
        Ok(self.register_inner(token, value, source))
    }

    /// Register an anonymous middleware-only plugin from a dependency list
    /// and a middleware builder.
    #[track_caller]
    pub fn middleware<F>(&mut self, deps: &[(&str, &Token)], builder: F) -> Result<()>
    where
        F: Fn(&ResolvedDeps) -> Middleware + Send + Sync + 'static,
    {
        let mut plugin = Plugin::builder();
        for (name, token) in deps {
            plugin = plugin.dep(*name, token);
        }
        let plugin = plugin
            .middleware(move |deps, _provides| builder(deps))
            .build();
        self.register_plugin(plugin).map(|_| ())
    }

    fn register_inner(
        &mut self,
        token: Token,
        value: BoundValue,
        source: DebugSource,
    ) -> AliasHandle<'_> {
        // The renderer is a special case: it always runs last and does not
        // participate in aliasing.
        if token == *tokens::render_token() {
            debug!("registered renderer");
            self.renderer = Some(value);
            return AliasHandle {
                app: self,
                owner: None,
            };
        }

        token.record(TokenPhase::Registered, source);
        if let BoundValue::Plugin(plugin) = &value {
            token.record(TokenPhase::Plugin, plugin.source());
        }
        debug!(token = %token.name(), plugin = value.is_plugin(), "registered");

        let owner = token.id();
        self.store.bind(&token, value);
        AliasHandle {
            app: self,
            owner: Some(owner),
        }
    }

    /// Append an enhancer to `token`. Enhancers apply in registration order
    /// at resolve time, each wrapping the previous result; enhancing a token
    /// that was never registered is legal and waits for a later registration.
    #[track_caller]
    pub fn enhance<F>(&mut self, token: &Token, enhancer: F)
    where
        F: Fn(Option<ServiceValue>) -> BoundValue + Send + Sync + 'static,
    {
        token.record(TokenPhase::Enhanced, DebugSource::capture());
        debug!(token = %token.name(), "enhanced");
        self.store.add_enhancer(token, Box::new(enhancer));
    }

    /// Walk every registered token in registration order, resolving each one,
    /// then install the memo-backed service lookup and the assembled
    /// middleware chain with the renderer last.
    ///
    /// Single use: a second call fails with [`Error::UnsupportedOperation`].
    /// Every resolution failure is terminal for the configuration pass.
    pub fn resolve(&mut self) -> Result<()> {
        if self.services.is_some() {
            return Err(Error::unsupported_operation(
                "already-resolved",
                "resolve may only run once per app",
            ));
        }
        if !self.renderer_bound {
            let render_token = tokens::render_token();
            let renderer = self.renderer.take().ok_or_else(|| {
                Error::missing_registration(
                    render_token.name(),
                    Vec::new(),
                    render_token.source_for(TokenPhase::Created),
                )
            })?;
            self.store.bind(render_token, renderer);
            self.renderer_bound = true;
        }

        let timing_enabled = self
            .store
            .contains(tokens::enable_middleware_timing_token().id());
        let resolver = Resolver {
            store: &self.store,
            timing_enabled,
        };

        let mut state = ResolutionState::default();
        for token in resolver.store.order() {
            // Values are discarded here; the walk's side effects (middleware
            // order, queued cleanups, the memo) are what matters.
            resolver.resolve_token(&mut state, token, None)?;
        }

        // Cleanups bind late so they read final, post-enhancer values.
        for (token_id, cleanup) in std::mem::take(&mut state.pending_cleanups) {
            let value = state.resolved.get(&token_id).cloned().flatten();
            self.cleanups.push(move || cleanup(value.clone()));
        }

        info!(
            services = state.resolved.len(),
            middleware = state.resolved_plugins.len(),
            cleanups = self.cleanups.len(),
            timing_enabled,
            "resolved dependency graph"
        );

        self.middleware_chain = std::mem::take(&mut state.resolved_plugins);
        self.services = Some(state.resolved);
        Ok(())
    }

    /// Memoized resolved value for `token`. `None` for optional tokens that
    /// were intentionally absent. Fails with [`Error::UnresolvedLookup`]
    /// before [`App::resolve`] completes.
    pub fn service(&self, token: &Token) -> Result<Option<ServiceValue>> {
        let services = self.services.as_ref().ok_or(Error::UnresolvedLookup)?;
        Ok(services.get(&token.id()).cloned().flatten())
    }

    /// Typed convenience over [`App::service`]: downcasts the resolved value
    /// to `T`, yielding `None` when absent or of another type.
    pub fn service_as<T: Any + Send + Sync>(&self, token: &Token) -> Result<Option<Arc<T>>> {
        Ok(self
            .service(token)?
            .and_then(|value| value.downcast::<T>().ok()))
    }

    /// The assembled middleware chain, renderer last. Empty before
    /// [`App::resolve`].
    pub fn middleware_chain(&self) -> &[Middleware] {
        &self.middleware_chain
    }

    /// Drive the assembled chain for one request.
    pub async fn handle(&self, ctx: Context) -> Result<()> {
        compose(&self.middleware_chain)(ctx, noop_next()).await
    }

    /// Run every teardown queued during resolution concurrently; all are
    /// awaited regardless of earlier failures and the first failure is
    /// reported after all settle.
    pub async fn cleanup(&mut self) -> Result<()> {
        self.cleanups.run_all().await
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("registered", &self.store.order().len())
            .field("renderer", &(self.renderer.is_some() || self.renderer_bound))
            .field("resolved", &self.services.is_some())
            .field("middleware", &self.middleware_chain.len())
            .finish_non_exhaustive()
    }
}

/// Scopes alias declarations to the registration that produced it.
pub struct AliasHandle<'a> {
    app: &'a mut App,
    /// `None` for the renderer registration, which rejects aliasing.
    owner: Option<TokenId>,
}

impl fmt::Debug for AliasHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliasHandle")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl AliasHandle<'_> {
    /// While resolving the owning registration's dependencies, redirect any
    /// request for `source` to `dest`. Lexically scoped: sibling plugins
    /// resolving `source` are unaffected. Chainable.
    #[track_caller]
    pub fn alias(self, source: &Token, dest: &Token) -> Result<Self> {
        let site = DebugSource::capture();
        let Some(owner) = self.owner else {
            return Err(Error::unsupported_operation(
                "render-token-alias",
                "aliasing the renderer registration is not supported",
            ));
        };
        source.record(TokenPhase::AliasFrom, site);
        dest.record(TokenPhase::AliasTo, site);
        debug!(from = %source.name(), to = %dest.name(), "aliased");
        self.app.store.add_alias(owner, source, dest);
        Ok(self)
    }
}
