//! toolrelay: chat-driven command and session engine for remote tool servers.
//!
//! Text comes in with a conversation key, is parsed into a command, routed
//! to the session manager or the tool invoker, and comes back out as text.
//! See [`dispatcher::Dispatcher`] for the entry point.

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod format;
pub mod invoker;
pub mod logging;
pub mod schema;
pub mod session;
pub mod transport;
pub mod validation;

#[cfg(test)]
mod testing;

pub use dispatcher::Dispatcher;

// ─── UTF-8 Safe Truncation ──────────────────────────────────────────────────

/// Truncate a string to at most `max_chars` characters.
///
/// Always returns a prefix of `s` ending on a char boundary.
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
