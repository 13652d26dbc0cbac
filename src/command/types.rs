//! Typed command produced by the parser.

use std::fmt;

use serde_json::{Map, Value};

use super::errors::ParseError;

// ─── Verb ────────────────────────────────────────────────────────────────────

/// The action a line of chat input resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Connect,
    Disconnect,
    List,
    Call,
    Shorthand,
    Schema,
    Status,
    Help,
    Unknown,
}

impl Verb {
    /// Every verb a user can type, in help-listing order.
    pub const STRUCTURED: [Verb; 8] = [
        Verb::Connect,
        Verb::Disconnect,
        Verb::List,
        Verb::Call,
        Verb::Shorthand,
        Verb::Schema,
        Verb::Status,
        Verb::Help,
    ];

    /// Canonical lowercase keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Connect => "connect",
            Verb::Disconnect => "disconnect",
            Verb::List => "list",
            Verb::Call => "call",
            Verb::Shorthand => "shorthand",
            Verb::Schema => "schema",
            Verb::Status => "status",
            Verb::Help => "help",
            Verb::Unknown => "unknown",
        }
    }

    /// Resolve a structured keyword (case-insensitive). `unknown` is not a keyword.
    pub fn from_keyword(word: &str) -> Option<Verb> {
        Self::STRUCTURED
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Auth Flags ──────────────────────────────────────────────────────────────

/// Credential source given on a `connect` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFlag {
    /// `--token VALUE`
    Token(String),
    /// `--token-env-var NAME`, resolved at connect time.
    EnvVar(String),
}

// ─── ParsedCommand ───────────────────────────────────────────────────────────

/// Arguments extracted from the remainder of a command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArgs {
    /// Tool arguments for `call`/`shorthand`. Shorthand values are kept as text.
    pub values: Map<String, Value>,
    /// Credential flag for `connect`.
    pub auth: Option<AuthFlag>,
    /// Non-fatal problems (dropped shorthand tokens, ignored flags).
    pub warnings: Vec<String>,
    /// Set when the line could not be turned into a usable command.
    pub error: Option<ParseError>,
}

/// One line of input, parsed. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub verb: Verb,
    /// URL for `connect`, tool name for `call`/`shorthand`/`schema`, topic for `help`.
    pub target: Option<String>,
    pub raw_args: RawArgs,
    pub source_text: String,
}

impl ParsedCommand {
    pub(crate) fn new(verb: Verb, target: Option<String>, raw_args: RawArgs, source: &str) -> Self {
        Self {
            verb,
            target,
            raw_args,
            source_text: source.to_string(),
        }
    }

    /// An `unknown` command carrying the reason parsing failed.
    pub(crate) fn invalid(
        error: ParseError,
        target: Option<String>,
        warnings: Vec<String>,
        source: &str,
    ) -> Self {
        Self::new(
            Verb::Unknown,
            target,
            RawArgs {
                warnings,
                error: Some(error),
                ..RawArgs::default()
            },
            source,
        )
    }

    /// The parse error attached to this command, if any.
    pub fn error(&self) -> Option<&ParseError> {
        self.raw_args.error.as_ref()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
