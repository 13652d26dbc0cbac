//! Command parsing error types.

use thiserror::Error;

/// Why a line of input could not be turned into a command.
///
/// These never escape the parser as `Err`: they ride along on an `unknown`
/// command so the dispatcher can render them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `call` arguments were not a single JSON object.
    #[error("invalid JSON arguments: {detail}")]
    InvalidJson { detail: String },

    /// Nothing in the input matched a command or phrase.
    #[error("unknown command: '{input}'")]
    UnknownCommand { input: String },

    /// A shorthand token was not `key=value`.
    #[error("malformed shorthand argument: '{token}'")]
    MalformedShorthand { token: String },

    /// Both `--token` and `--token-env-var` were given.
    #[error("use either --token or --token-env-var, not both")]
    ConflictingAuthFlags,

    /// A required positional argument or flag value is absent.
    #[error("{verb}: missing {what}")]
    MissingArgument { verb: String, what: String },

    /// The connect target is not an http(s) URL.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
