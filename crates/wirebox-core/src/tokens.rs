//! Well-known engine tokens
//!
//! Process-wide tokens the engine itself gives meaning to. The render token
//! names the terminal middleware and is always resolved last; the timing flag
//! token, when registered with any value, switches on the per-request
//! middleware timing wrapper.

use std::sync::LazyLock;
use wirebox_domain::Token;

static RENDER: LazyLock<Token> = LazyLock::new(|| Token::new("RenderToken"));

static ENABLE_MIDDLEWARE_TIMING: LazyLock<Token> =
    LazyLock::new(|| Token::optional("EnableMiddlewareTimingToken"));

/// The token the terminal render middleware is registered under. Appended to
/// the resolution order last regardless of registration order, and refuses
/// alias requests.
pub fn render_token() -> &'static Token {
    &RENDER
}

/// Flag token enabling the middleware timing wrapper. Optional: leaving it
/// unregistered installs every middleware unwrapped, at zero overhead.
pub fn enable_middleware_timing_token() -> &'static Token {
    &ENABLE_MIDDLEWARE_TIMING
}
