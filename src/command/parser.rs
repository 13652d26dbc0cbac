//! Structured command parsing: stage two of command recognition.
//!
//! [`parse`] is total: every input yields exactly one [`ParsedCommand`].
//! Problems are recorded on the command (`raw_args.error` / `raw_args.warnings`)
//! instead of being returned, so a bad line never disturbs session state.
//!
//! Grammar (verb matched case-insensitively, optional `!` prefix):
//!
//! ```text
//! connect <url> [--token TOKEN | --token-env-var VAR]
//! disconnect
//! list
//! call <tool_name> <json_object>
//! shorthand <tool_name> [key=value ...]
//! schema <tool_name>
//! status
//! help [verb]
//! ```

use serde_json::{Map, Value};

use super::errors::ParseError;
use super::phrases::{resolve_verb, split_first_word};
use super::types::{AuthFlag, ParsedCommand, RawArgs, Verb};

// ─── Entry Point ─────────────────────────────────────────────────────────────

/// Parse one line of chat input.
pub fn parse(text: &str) -> ParsedCommand {
    let Some((verb, rest)) = resolve_verb(text) else {
        return ParsedCommand::invalid(
            ParseError::UnknownCommand {
                input: text.trim().to_string(),
            },
            None,
            Vec::new(),
            text,
        );
    };

    match verb {
        Verb::Connect => parse_connect(rest, text),
        Verb::Call => parse_call(rest, text),
        Verb::Shorthand => parse_shorthand(rest, text),
        Verb::Schema => parse_schema(rest, text),
        Verb::Help => {
            let (topic, _) = split_first_word(rest);
            let topic = (!topic.is_empty()).then(|| topic.to_ascii_lowercase());
            ParsedCommand::new(Verb::Help, topic, RawArgs::default(), text)
        }
        Verb::Disconnect | Verb::List | Verb::Status => {
            ParsedCommand::new(verb, None, RawArgs::default(), text)
        }
        Verb::Unknown => unreachable_unknown(text),
    }
}

/// `resolve_verb` never yields `Unknown`; keep the match total without panicking.
fn unreachable_unknown(text: &str) -> ParsedCommand {
    ParsedCommand::invalid(
        ParseError::UnknownCommand {
            input: text.trim().to_string(),
        },
        None,
        Vec::new(),
        text,
    )
}

// ─── connect ─────────────────────────────────────────────────────────────────

/// Parse `connect <url> [--token TOKEN | --token-env-var VAR]`.
///
/// The URL may be omitted; the dispatcher falls back to the configured
/// default endpoint in that case.
fn parse_connect(rest: &str, source: &str) -> ParsedCommand {
    let mut warnings = Vec::new();
    let mut url: Option<String> = None;
    let mut token: Option<String> = None;
    let mut env_var: Option<String> = None;

    let tokens = split_respecting_quotes(rest);
    let mut iter = tokens.into_iter().peekable();

    while let Some(tok) = iter.next() {
        if !tok.closed {
            warnings.push(format!("unterminated quote in '{}'", tok.text));
        }

        let (flag, inline_value) = match tok.text.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (tok.text.clone(), None),
        };

        match flag.as_str() {
            "--token" | "--token-env-var" => {
                let value = match inline_value {
                    Some(v) => Some(v),
                    None => match iter.peek() {
                        Some(next) if !next.text.starts_with("--") => {
                            iter.next().map(|t| t.text)
                        }
                        _ => None,
                    },
                };
                let Some(value) = value.filter(|v| !v.is_empty()) else {
                    return ParsedCommand::invalid(
                        ParseError::MissingArgument {
                            verb: "connect".into(),
                            what: format!("value for {flag}"),
                        },
                        url,
                        warnings,
                        source,
                    );
                };
                if flag == "--token" {
                    token = Some(value);
                } else {
                    env_var = Some(value);
                }
            }
            f if f.starts_with("--") => {
                warnings.push(format!("ignored unknown flag '{f}'"));
            }
            _ if url.is_none() => url = Some(tok.text),
            _ => warnings.push(format!("ignored extra argument '{}'", tok.text)),
        }
    }

    let auth = match (token, env_var) {
        (Some(_), Some(_)) => {
            return ParsedCommand::invalid(ParseError::ConflictingAuthFlags, url, warnings, source);
        }
        (Some(t), None) => Some(AuthFlag::Token(t)),
        (None, Some(v)) => Some(AuthFlag::EnvVar(v)),
        (None, None) => None,
    };

    if let Some(ref raw) = url {
        if let Err(reason) = check_endpoint_url(raw) {
            return ParsedCommand::invalid(
                ParseError::InvalidUrl {
                    url: raw.clone(),
                    reason,
                },
                url.clone(),
                warnings,
                source,
            );
        }
    }

    ParsedCommand::new(
        Verb::Connect,
        url,
        RawArgs {
            auth,
            warnings,
            ..RawArgs::default()
        },
        source,
    )
}

/// Accept only absolute http(s) URLs.
pub(crate) fn check_endpoint_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}' (expected http or https)")),
    }
}

// ─── call ────────────────────────────────────────────────────────────────────

/// Parse `call <tool_name> <json_object>`. A missing body means `{}`.
fn parse_call(rest: &str, source: &str) -> ParsedCommand {
    let (tool, body) = split_first_word(rest);
    if tool.is_empty() || tool.starts_with('{') {
        return missing_tool_name("call", source);
    }

    let body = body.trim();
    let values = if body.is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return ParsedCommand::invalid(
                    ParseError::InvalidJson {
                        detail: format!(
                            "arguments must be a JSON object, got {}",
                            json_kind(&other)
                        ),
                    },
                    Some(tool.to_string()),
                    Vec::new(),
                    source,
                );
            }
            Err(e) => {
                return ParsedCommand::invalid(
                    ParseError::InvalidJson {
                        detail: e.to_string(),
                    },
                    Some(tool.to_string()),
                    Vec::new(),
                    source,
                );
            }
        }
    };

    ParsedCommand::new(
        Verb::Call,
        Some(tool.to_string()),
        RawArgs {
            values,
            ..RawArgs::default()
        },
        source,
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ─── shorthand ───────────────────────────────────────────────────────────────

/// Parse `shorthand <tool_name> [key=value ...]`.
///
/// Values stay textual; the validator coerces them against the schema.
/// Tokens that are not `key=value` are dropped with a warning.
fn parse_shorthand(rest: &str, source: &str) -> ParsedCommand {
    let (tool, body) = split_first_word(rest);
    if tool.is_empty() || tool.contains('=') {
        return missing_tool_name("shorthand", source);
    }

    let mut values = Map::new();
    let mut warnings = Vec::new();

    for tok in split_respecting_quotes(body) {
        match parse_key_value(&tok) {
            Ok((key, value)) => {
                if values.insert(key.clone(), Value::String(value)).is_some() {
                    warnings.push(format!("'{key}' given more than once; using the last value"));
                }
            }
            Err(err) => warnings.push(format!("{err}, dropped")),
        }
    }

    ParsedCommand::new(
        Verb::Shorthand,
        Some(tool.to_string()),
        RawArgs {
            values,
            warnings,
            ..RawArgs::default()
        },
        source,
    )
}

/// Split a shorthand token into `(key, value)`.
fn parse_key_value(tok: &Token) -> Result<(String, String), ParseError> {
    let malformed = || ParseError::MalformedShorthand {
        token: tok.text.clone(),
    };

    if !tok.closed {
        return Err(malformed());
    }
    let (key, value) = tok.text.split_once('=').ok_or_else(malformed)?;
    let key_ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !key_ok {
        return Err(malformed());
    }
    Ok((key.to_string(), value.to_string()))
}

// ─── schema ──────────────────────────────────────────────────────────────────

fn parse_schema(rest: &str, source: &str) -> ParsedCommand {
    let (tool, extra) = split_first_word(rest);
    if tool.is_empty() {
        return missing_tool_name("schema", source);
    }
    let mut raw_args = RawArgs::default();
    if !extra.is_empty() {
        raw_args
            .warnings
            .push(format!("ignored trailing text '{extra}'"));
    }
    ParsedCommand::new(Verb::Schema, Some(tool.to_string()), raw_args, source)
}

fn missing_tool_name(verb: &str, source: &str) -> ParsedCommand {
    ParsedCommand::invalid(
        ParseError::MissingArgument {
            verb: verb.to_string(),
            what: "tool name".into(),
        },
        None,
        Vec::new(),
        source,
    )
}

// ─── Tokenizer ───────────────────────────────────────────────────────────────

/// A whitespace-delimited token with its quotes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    /// False when a quote opened inside this token never closed.
    closed: bool,
}

/// Split on whitespace, keeping single- or double-quoted substrings intact.
///
/// `query="stable diffusion" limit=5` → `query=stable diffusion`, `limit=5`.
/// An unterminated quote swallows the rest of the input into one token
/// marked `closed: false`.
fn split_respecting_quotes(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        closed: true,
                    });
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        tokens.push(Token {
            text: current,
            closed: quote.is_none(),
        });
    }
    tokens
}

// ─── Tests ───────────────────────────────────────────────────────────────────
