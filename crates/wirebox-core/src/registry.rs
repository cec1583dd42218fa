//! Registration store
//!
//! Identity-keyed bookkeeping accumulated during the configure phase. One
//! record per token identity holds the bound value, the alias table scoped to
//! that token's dependency resolution, and the ordered enhancer list.
//! Re-registering a token overwrites the bound value but preserves aliases
//! and enhancers already accumulated; enhancing a never-registered token
//! creates the record early and waits for a later registration.

use std::collections::HashMap;
use wirebox_domain::{BoundValue, Enhancer, Token, TokenId};

/// Bookkeeping for one token identity.
pub(crate) struct Registration {
    /// The token itself, kept for name/debug-log access in diagnostics.
    pub token: Token,
    /// The bound value. `None` for records created by `enhance` alone.
    pub value: Option<BoundValue>,
    /// Redirections applied while resolving this token's dependencies.
    pub aliases: HashMap<TokenId, Token>,
    /// Applied in registration order; each wraps the previous result.
    pub enhancers: Vec<Enhancer>,
}

impl Registration {
    fn empty(token: &Token) -> Self {
        Self {
            token: token.clone(),
            value: None,
            aliases: HashMap::new(),
            enhancers: Vec::new(),
        }
    }
}

/// Identity-keyed store of registrations, owned by one engine instance.
#[derive(Default)]
pub(crate) struct RegistrationStore {
    records: HashMap<TokenId, Registration>,
    /// Registration order, which is also the resolution order. A re-registered
    /// token appears twice; the second visit is a memo hit.
    order: Vec<Token>,
}

impl RegistrationStore {
    /// Bind `value` to `token`, appending it to the resolution order.
    pub fn bind(&mut self, token: &Token, value: BoundValue) {
        self.order.push(token.clone());
        let record = self
            .records
            .entry(token.id())
            .or_insert_with(|| Registration::empty(token));
        record.value = Some(value);
    }

    /// Record an alias scoped to `owner`'s dependency resolution.
    pub fn add_alias(&mut self, owner: TokenId, source: &Token, dest: &Token) {
        if let Some(record) = self.records.get_mut(&owner) {
            record.aliases.insert(source.id(), dest.clone());
        }
    }

    /// Append an enhancer to `token`, creating the record if the token was
    /// never registered.
    pub fn add_enhancer(&mut self, token: &Token, enhancer: Enhancer) {
        self.records
            .entry(token.id())
            .or_insert_with(|| Registration::empty(token))
            .enhancers
            .push(enhancer);
    }

    pub fn get(&self, id: TokenId) -> Option<&Registration> {
        self.records.get(&id)
    }

    /// True if any record exists for `id`, bound or enhancer-only.
    pub fn contains(&self, id: TokenId) -> bool {
        self.records.contains_key(&id)
    }

    /// Resolution order: tokens in the order they were registered.
    pub fn order(&self) -> &[Token] {
        &self.order
    }
}
