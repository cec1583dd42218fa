//! Recursive resolution walk
//!
//! Depth-first, memoized traversal of the registration graph. Recursion, not
//! concurrency, drives dependency ordering: the `resolving` sentinel set is
//! only ever touched by the single active call stack, which is what makes
//! cycle detection a plain membership test.
//!
//! Per token: alias redirection first, then memo lookup, then the cycle
//! check, then the missing-registration diagnostics, and only then plugin
//! invocation and the enhancer chain. The diagnostic reverse-dependency scan
//! (who required the missing token?) reads the store and the applied-enhancer
//! trail without mutating either.

use crate::registry::RegistrationStore;
use crate::timing::wrap_middleware;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::trace;
use wirebox_domain::{
    BoundValue, CleanupFn, Error, Middleware, Plugin, ResolvedDeps, Result, ServiceValue, Token,
    TokenId, TokenPhase,
};

/// Record of one applied enhancer, kept for diagnostic reverse lookup.
struct AppliedEnhancer {
    /// Display name of the token the enhancer was attached to
    owner: String,
    /// Declared deps of the plugin the enhancer produced, if it produced one
    deps: Option<BTreeMap<String, Token>>,
}

/// Transient state for one `resolve()` call.
#[derive(Default)]
pub(crate) struct ResolutionState {
    /// Memo table; append-only during the walk and authoritative afterwards.
    pub resolved: HashMap<TokenId, Option<ServiceValue>>,
    /// Cycle sentinel: tokens with an in-flight recursive call.
    resolving: HashSet<TokenId>,
    /// Middleware in resolution order; replaces the plugin list.
    pub resolved_plugins: Vec<Middleware>,
    /// Cleanups queued during the walk, bound to final values afterwards.
    pub pending_cleanups: Vec<(TokenId, CleanupFn)>,
    applied_enhancers: Vec<AppliedEnhancer>,
}

/// Borrowing view over the store for the duration of one walk.
pub(crate) struct Resolver<'a> {
    pub store: &'a RegistrationStore,
    /// True when the timing flag token is registered.
    pub timing_enabled: bool,
}

impl Resolver<'_> {
    /// Resolve one token, recursively resolving plugin dependencies first.
    ///
    /// `alias_scope` is the alias table of the plugin whose dependency we are
    /// resolving; aliasing is lexically scoped to the plugin that declared it
    /// and applies before the memo lookup, so an alias and its target always
    /// yield the same resolved value.
    pub fn resolve_token(
        &self,
        state: &mut ResolutionState,
        token: &Token,
        alias_scope: Option<&HashMap<TokenId, Token>>,
    ) -> Result<Option<ServiceValue>> {
        let token = match alias_scope.and_then(|aliases| aliases.get(&token.id())) {
            Some(dest) => dest.clone(),
            None => token.clone(),
        };

        if let Some(value) = state.resolved.get(&token.id()) {
            return Ok(value.clone());
        }

        if state.resolving.contains(&token.id()) {
            return Err(Error::circular_dependency(
                token.name(),
                token.source_for(TokenPhase::Registered),
            ));
        }

        let Some(record) = self.store.get(token.id()) else {
            if token.is_optional() {
                return Ok(None);
            }
            return Err(self.missing_or_ambiguous(state, &token));
        };

        if record.value.is_none() {
            if record.enhancers.is_empty() {
                if token.is_optional() {
                    return Ok(None);
                }
                return Err(self.missing_or_ambiguous(state, &token));
            }
            if !token.is_optional() {
                return Err(self.missing_or_ambiguous(state, &token));
            }
            // Optional token with enhancers but no registration: fall through
            // and run the enhancer chain against None.
        }

        trace!(token = %token.name(), "resolving");
        state.resolving.insert(token.id());

        let mut provides = match &record.value {
            Some(BoundValue::Plugin(plugin)) => {
                self.invoke_plugin(state, &token, plugin, &record.aliases)?
            }
            Some(BoundValue::Value(value)) => Some(value.clone()),
            None => None,
        };

        for enhancer in &record.enhancers {
            match enhancer(provides.clone()) {
                BoundValue::Plugin(plugin) => {
                    // Recorded before invocation so the diagnostic scan sees
                    // this enhancer's deps while they are being resolved.
                    state.applied_enhancers.push(AppliedEnhancer {
                        owner: token.name().to_string(),
                        deps: Some(plugin.deps().clone()),
                    });
                    provides = self.invoke_plugin(state, &token, &plugin, &record.aliases)?;
                }
                BoundValue::Value(value) => {
                    state.applied_enhancers.push(AppliedEnhancer {
                        owner: token.name().to_string(),
                        deps: None,
                    });
                    provides = Some(value);
                }
            }
        }

        state.resolving.remove(&token.id());
        state.resolved.insert(token.id(), provides.clone());
        Ok(provides)
    }

    /// Resolve a plugin's declared dependencies, invoke `provides`, append
    /// its middleware to the chain, and queue its cleanup under `token`.
    fn invoke_plugin(
        &self,
        state: &mut ResolutionState,
        token: &Token,
        plugin: &Plugin,
        alias_scope: &HashMap<TokenId, Token>,
    ) -> Result<Option<ServiceValue>> {
        let mut deps = ResolvedDeps::default();
        for (name, dep_token) in plugin.deps() {
            let value = self.resolve_token(state, dep_token, Some(alias_scope))?;
            deps.insert(name.clone(), value);
        }

        let provides = plugin.provide(&deps);

        if let Some(middleware) = plugin.build_middleware(&deps, provides.as_ref()) {
            let middleware = if self.timing_enabled {
                wrap_middleware(middleware, token)
            } else {
                middleware
            };
            state.resolved_plugins.push(middleware);
        }

        if let Some(cleanup) = plugin.cleanup_fn() {
            state.pending_cleanups.push((token.id(), cleanup));
        }

        Ok(provides)
    }

    /// Build the diagnostic for a required token with nothing bound. A name
    /// collision across distinct identities is reported as ambiguity; failing
    /// that, every registered plugin and applied enhancer that declared the
    /// token is collected as a dependent. Read-only over resolution state.
    fn missing_or_ambiguous(&self, state: &ResolutionState, token: &Token) -> Error {
        let created_at = token.source_for(TokenPhase::Created);

        let name_collision = self
            .store
            .order()
            .iter()
            .any(|other| other.name() == token.name() && other.id() != token.id());
        if name_collision {
            return Error::ambiguous_token_name(token.name(), created_at);
        }

        let mut dependents = Vec::new();
        let mut seen = HashSet::new();
        for owner in self.store.order() {
            if !seen.insert(owner.id()) {
                continue;
            }
            let Some(record) = self.store.get(owner.id()) else {
                continue;
            };
            if let Some(BoundValue::Plugin(plugin)) = record.value.as_ref() {
                if plugin.deps().values().any(|dep| dep.id() == token.id()) {
                    dependents.push(record.token.name().to_string());
                }
            }
        }
        for applied in &state.applied_enhancers {
            let declares = applied
                .deps
                .as_ref()
                .is_some_and(|deps| deps.values().any(|dep| dep.id() == token.id()));
            if declares {
                dependents.push(format!("EnhancerOf<{}>", applied.owner));
            }
        }

        Error::missing_registration(token.name(), dependents, created_at)
    }
}
