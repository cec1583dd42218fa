//! Error handling types
//!
//! Every error here is a configuration error: it aborts the whole
//! registration/resolution pass and is meant to be fixed before deployment,
//! never caught and retried at runtime. Each variant carries a stable
//! [`Error::category`] string for documentation linking. Messages include the
//! full dependent-chain detail in debug builds and stay generic in release
//! builds.

use crate::source::DebugSource;
use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal registration/resolution error.
#[derive(Error, Debug)]
pub enum Error {
    /// A bare value was registered without a token. Only plugins may be
    /// registered tokenless.
    #[error("{message}")]
    InvalidRegistration {
        /// Rendered diagnostic message
        message: String,
    },

    /// An operation the engine explicitly refuses, such as aliasing the
    /// renderer registration or resolving a second time.
    #[error("{message}")]
    UnsupportedOperation {
        /// Stable category for documentation linking
        category: &'static str,
        /// Rendered diagnostic message
        message: String,
    },

    /// A token is reachable from itself during resolution.
    #[error("{message}")]
    CircularDependency {
        /// Display name of the token on the cycle
        token: String,
        /// Call site of the token's registration, when recorded
        location: Option<DebugSource>,
        /// Rendered diagnostic message
        message: String,
    },

    /// A required, unregistered token shares a display name with one or more
    /// distinct registered tokens.
    #[error("{message}")]
    AmbiguousTokenName {
        /// The colliding display name
        token: String,
        /// Call site of the token's creation, when recorded
        location: Option<DebugSource>,
        /// Rendered diagnostic message
        message: String,
    },

    /// A required token was never registered.
    #[error("{message}")]
    MissingRegistration {
        /// Display name of the missing token
        token: String,
        /// Display names of every plugin/enhancer that declared the token as
        /// a dependency
        dependents: Vec<String>,
        /// Call site of the token's creation, when recorded
        location: Option<DebugSource>,
        /// Rendered diagnostic message
        message: String,
    },

    /// `service` was invoked before `resolve` completed.
    #[error("cannot get service from an unresolved app")]
    UnresolvedLookup,
}

impl Error {
    /// Stable machine-checkable category, suitable for documentation links.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRegistration { .. } => "value-without-token",
            Self::UnsupportedOperation { category, .. } => category,
            Self::CircularDependency { .. } => "circular-dependencies",
            Self::AmbiguousTokenName { .. } => "duplicate-token-names",
            Self::MissingRegistration { .. } => "missing-registration",
            Self::UnresolvedLookup => "unresolved-app",
        }
    }

    /// A bare value registered where only a plugin is accepted.
    pub fn invalid_registration(detail: impl Into<String>) -> Self {
        let message = if cfg!(debug_assertions) {
            detail.into()
        } else {
            "invalid configuration registration".to_string()
        };
        Self::InvalidRegistration { message }
    }

    /// An operation the engine refuses outright.
    pub fn unsupported_operation(category: &'static str, message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            category,
            message: message.into(),
        }
    }

    /// A token reachable from itself during the resolution walk.
    pub fn circular_dependency(token: impl Into<String>, location: Option<DebugSource>) -> Self {
        let token = token.into();
        let message = match location {
            Some(at) if cfg!(debug_assertions) => {
                format!("cannot resolve circular dependency: \"{token}\" (registered at {at})")
            }
            _ => format!("cannot resolve circular dependency: \"{token}\""),
        };
        Self::CircularDependency {
            token,
            location,
            message,
        }
    }

    /// A required token whose display name collides with other registered
    /// tokens.
    pub fn ambiguous_token_name(token: impl Into<String>, location: Option<DebugSource>) -> Self {
        let token = token.into();
        let message = format!(
            "missing registration for token \"{token}\": other tokens with this name have been registered"
        );
        Self::AmbiguousTokenName {
            token,
            location,
            message,
        }
    }

    /// A required token with nothing bound, reported with the dependents that
    /// declared it. Pluralization follows the dependent count.
    pub fn missing_registration(
        token: impl Into<String>,
        dependents: Vec<String>,
        location: Option<DebugSource>,
    ) -> Self {
        let token = token.into();
        let message = if cfg!(debug_assertions) && !dependents.is_empty() {
            let plural = if dependents.len() > 1 { "s" } else { "" };
            let list = dependents
                .iter()
                .map(|name| format!("\"{name}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "missing registration for token \"{token}\": this token is a required dependency of the plugin{plural} registered to {list} token{plural}"
            )
        } else {
            format!("missing registration for token \"{token}\"")
        };
        Self::MissingRegistration {
            token,
            dependents,
            location,
            message,
        }
    }
}
