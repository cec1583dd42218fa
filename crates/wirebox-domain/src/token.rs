//! Identity tokens
//!
//! A [`Token`] names a dependency slot. Two tokens refer to the same slot iff
//! they are identity-equal: equality, hashing and registry keys all go through
//! the process-unique [`TokenId`] minted at construction, never through the
//! display name. Names exist only for humans, and duplicate names across
//! distinct tokens are themselves a diagnosable integration bug.
//!
//! Each token carries an append-only debug log of `(phase, call site)` entries
//! populated by the engine as the token is registered, aliased or enhanced.
//! The log is the side channel failure diagnostics are reconstructed from.

use crate::source::DebugSource;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Whether resolution treats an unregistered token as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Resolution fails if nothing is bound to the token.
    Required,
    /// Resolution yields `None` if nothing is bound to the token.
    Optional,
}

/// Lifecycle phases recorded in a token's debug log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPhase {
    /// Token construction
    Created,
    /// A value or plugin was bound to the token
    Registered,
    /// The bound value was a plugin; the source is the plugin's creation site
    Plugin,
    /// The token was the source of an alias redirection
    AliasFrom,
    /// The token was the destination of an alias redirection
    AliasTo,
    /// An enhancer was attached to the token
    Enhanced,
}

/// One entry in a token's debug log.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DebugEntry {
    /// What happened
    pub phase: TokenPhase,
    /// Where it happened
    pub source: DebugSource,
}

/// Process-unique token identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u64);

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(0);

struct TokenInner {
    id: TokenId,
    name: String,
    kind: TokenKind,
    log: Mutex<Vec<DebugEntry>>,
}

/// Opaque, identity-compared handle naming a dependency slot.
///
/// Cheap to clone; all clones share identity and the debug log.
#[derive(Clone)]
pub struct Token {
    inner: Arc<TokenInner>,
}

impl Token {
    /// Create a required token.
    #[track_caller]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, TokenKind::Required)
    }

    /// Create an optional token: resolving it without a registration yields
    /// `None` instead of a missing-registration error.
    #[track_caller]
    pub fn optional(name: impl Into<String>) -> Self {
        Self::with_kind(name, TokenKind::Optional)
    }

    #[track_caller]
    fn with_kind(name: impl Into<String>, kind: TokenKind) -> Self {
        let token = Self {
            inner: Arc::new(TokenInner {
                id: TokenId(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed)),
                name: name.into(),
                kind,
                log: Mutex::new(Vec::new()),
            }),
        };
        token.record(TokenPhase::Created, DebugSource::capture());
        token
    }

    /// Process-unique identity.
    pub fn id(&self) -> TokenId {
        self.inner.id
    }

    /// Human-readable display name. Not an identity.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Required or optional.
    pub fn kind(&self) -> TokenKind {
        self.inner.kind
    }

    /// True if resolution may yield `None` for this token.
    pub fn is_optional(&self) -> bool {
        self.inner.kind == TokenKind::Optional
    }

    /// Append an entry to the debug log. The log is append-only.
    pub fn record(&self, phase: TokenPhase, source: DebugSource) {
        self.inner
            .log
            .lock()
            .expect("token debug log lock poisoned")
            .push(DebugEntry { phase, source });
    }

    /// Snapshot of the debug log.
    pub fn debug_log(&self) -> Vec<DebugEntry> {
        self.inner
            .log
            .lock()
            .expect("token debug log lock poisoned")
            .clone()
    }

    /// First recorded call site for `phase`, if any.
    pub fn source_for(&self, phase: TokenPhase) -> Option<DebugSource> {
        self.inner
            .log
            .lock()
            .expect("token debug log lock poisoned")
            .iter()
            .find(|entry| entry.phase == phase)
            .map(|entry| entry.source)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}
