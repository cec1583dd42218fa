//! Call-site capture for diagnostics
//!
//! Registration, aliasing and enhancement record where they were called from,
//! so resolution failures can point back at the line that introduced the
//! offending binding. The engine only captures and renders these locations; it
//! never interprets them.

use serde::Serialize;
use std::fmt;
use std::panic::Location;

/// A captured call site: file, line and column as reported by the compiler.
///
/// Paths are workspace-relative for local code, which keeps rendered
/// diagnostics stable across machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DebugSource {
    /// Source file of the call site
    pub file: &'static str,
    /// 1-based line number
    pub line: u32,
    /// 1-based column number
    pub column: u32,
}

impl DebugSource {
    /// Capture the current caller's location.
    ///
    /// Every function between the user call site and this one must be
    /// `#[track_caller]` for the captured location to be the user's.
    #[track_caller]
    pub fn capture() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for DebugSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
