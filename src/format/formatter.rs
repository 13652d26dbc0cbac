//! Result Formatter: typed results and errors to chat text.

use crate::command::help::{help_text, usage};
use crate::command::{ParseError, Verb};
use crate::invoker::{ToolCallError, ToolCallResult};
use crate::schema::ToolDescriptor;
use crate::session::{ConnectSummary, SessionError, SessionState, SessionStatus};
use crate::validation::ValidationDiagnostics;

use super::payload::{render_payload, truncate_with_marker};
use super::schema::render_schema;

/// Default character budget for a tool payload.
pub const DEFAULT_PAYLOAD_CHAR_BUDGET: usize = 4000;

/// Default character budget for the raw schema block of `schema` output.
pub const DEFAULT_SCHEMA_CHAR_BUDGET: usize = 2000;

const NOT_CONNECTED: &str = "❌ Not connected to a tool server.\n\nUse `connect <url>` to connect first.";

/// Turns component results into the text sent back to the user.
#[derive(Debug, Clone)]
pub struct ResultFormatter {
    payload_char_budget: usize,
    schema_char_budget: usize,
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD_CHAR_BUDGET, DEFAULT_SCHEMA_CHAR_BUDGET)
    }
}

impl ResultFormatter {
    pub fn new(payload_char_budget: usize, schema_char_budget: usize) -> Self {
        Self {
            payload_char_budget,
            schema_char_budget,
        }
    }

    // ─── Tool Calls ──────────────────────────────────────────────────────

    pub fn tool_result(&self, result: &ToolCallResult) -> String {
        match result {
            ToolCallResult::Ok {
                tool_name, payload, ..
            } => {
                let rendered = render_payload(payload);
                let body = truncate_with_marker(&rendered.text, self.payload_char_budget);
                if rendered.is_error {
                    format!("❌ Tool '{tool_name}' reported an error:\n\n```\n{body}\n```")
                } else {
                    format!("✅ Tool call successful:\n\n```\n{body}\n```")
                }
            }
            ToolCallResult::Error(err) => self.tool_error(err),
        }
    }

    pub fn tool_error(&self, err: &ToolCallError) -> String {
        match err {
            ToolCallError::NotConnected { state } => not_connected(*state),
            ToolCallError::NotFound { name, suggestion } => match suggestion {
                Some(s) => format!(
                    "❌ Tool `{name}` not found, did you mean `{s}`?\n\nUse `list` to see available tools."
                ),
                None => format!("❌ Tool `{name}` not found.\n\nUse `list` to see available tools."),
            },
            ToolCallError::ValidationFailed(diagnostics) => validation_failed(diagnostics),
            ToolCallError::Timeout { tool, timeout_ms } => format!(
                "❌ Tool '{tool}' timed out after {timeout_ms}ms.\n\n\
                 The server may be busy. The session is still connected; try the call again."
            ),
            ToolCallError::TransportFailure {
                tool,
                detail,
                retryable,
            } => {
                let guidance = if *retryable {
                    "This looks temporary. The session is still connected; try the call again."
                } else {
                    "Check the arguments with `schema` and try again, or reconnect if the problem persists."
                };
                format!("❌ Tool '{tool}' failed: {detail}\n\n{guidance}")
            }
            ToolCallError::Cancelled { tool } => format!(
                "❌ Call to '{tool}' was cancelled because the session was disconnected.\n\n\
                 Use `connect <url>` to reconnect before calling tools again."
            ),
        }
    }

    // ─── Session Replies ─────────────────────────────────────────────────

    pub fn connected(&self, summary: &ConnectSummary) -> String {
        let mut out = format!("✅ Connected to {}", summary.endpoint);
        if summary.replaced {
            out.push_str(" (previous connection closed)");
        }
        out.push_str(&format!(
            "\n\nFound {} available tools. Use `list` to see them.",
            summary.tool_count
        ));
        if !summary.skipped.is_empty() {
            let skipped: Vec<String> = summary
                .skipped
                .iter()
                .map(|s| format!("- `{}`: {}", s.name, s.reason))
                .collect();
            out.push_str(&format!(
                "\n\nSkipped {} tool(s) with unusable schemas:\n{}",
                summary.skipped.len(),
                skipped.join("\n")
            ));
        }
        out
    }

    pub fn disconnected(&self, previous: Option<SessionState>) -> String {
        match previous {
            Some(_) => "✅ Disconnected from the tool server.".to_string(),
            None => "✅ Not connected; nothing to disconnect.".to_string(),
        }
    }

    pub fn status(&self, status: &SessionStatus) -> String {
        match status.state {
            SessionState::Connected => {
                let mut out = format!(
                    "📡 Status: Connected to {}",
                    status.endpoint.as_deref().unwrap_or("unknown")
                );
                out.push_str(&format!("\nAvailable tools: {}", status.tool_count));
                out.push_str(if status.has_token {
                    "\nAuthentication: Using token"
                } else {
                    "\nAuthentication: None"
                });
                if let Some(at) = status.connected_at {
                    out.push_str(&format!("\nConnected since: {}", at.format("%Y-%m-%d %H:%M:%S UTC")));
                }
                out
            }
            SessionState::Connecting => "📡 Status: Connecting...".to_string(),
            SessionState::Failed => format!(
                "📡 Status: Connection failed\nLast error: {}\n\nUse `connect <url>` to try again.",
                status.last_error.as_deref().unwrap_or("unknown")
            ),
            SessionState::Disconnected => "📡 Status: Not connected".to_string(),
        }
    }

    pub fn session_error(&self, err: &SessionError) -> String {
        match err {
            SessionError::NotConnected { state } => not_connected(*state),
            SessionError::Busy => "❌ A connection attempt is already in progress.\n\n\
                 Wait for it to finish, then try again."
                .to_string(),
            SessionError::ConnectFailed { endpoint, reason } => format!(
                "❌ Failed to connect to {endpoint}: {reason}\n\nCheck the URL and try `connect` again."
            ),
            SessionError::Unauthorized { reason } => format!(
                "❌ Authentication failed: {reason}\n\n\
                 Reconnect with `connect <url> --token TOKEN` or `connect <url> --token-env-var VAR`."
            ),
            SessionError::ToolNotFound { name, suggestion } => self.tool_error(&ToolCallError::NotFound {
                name: name.clone(),
                suggestion: suggestion.clone(),
            }),
            SessionError::Cancelled => {
                "❌ The operation was cancelled because the session was disconnected.".to_string()
            }
            SessionError::InvalidTransition { .. } => format!("❌ Error: {err}"),
        }
    }

    // ─── Catalog ─────────────────────────────────────────────────────────

    pub fn tool_list(&self, tools: &[ToolDescriptor]) -> String {
        if tools.is_empty() {
            return "No tools available. The connected server did not list any tools.".to_string();
        }

        let mut out = format!("📋 Available Tools ({}):\n\n", tools.len());
        for tool in tools {
            out.push_str(&format!(
                "**{}**\n{}\n\n",
                tool.name,
                tool.description.as_deref().unwrap_or("No description available")
            ));
            if tool.schema.properties.is_empty() {
                continue;
            }
            out.push_str("Arguments:\n");
            for (name, spec) in tool.schema.ordered_properties() {
                let marker = if tool.schema.is_required(name) { "*" } else { "" };
                out.push_str(&format!("- `{name}`{marker}: {}", spec.ty));
                if let Some(ref description) = spec.description {
                    out.push_str(&format!(" - {description}"));
                }
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str("Use `call [tool_name] {\"arg\": \"value\"}` to call a tool.\n");
        out.push_str("Or use the shorthand syntax: `shorthand [tool_name] arg=\"value\"`");
        out
    }

    pub fn schema(&self, tool: &ToolDescriptor) -> String {
        render_schema(tool, self.schema_char_budget)
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn help(&self, topic: Option<&str>) -> String {
        help_text(topic)
    }

    pub fn unknown(&self, text: &str) -> String {
        format!(
            "❓ Unknown command: `{}`\n\nUse `help` to see available commands.",
            text.trim()
        )
    }

    pub fn parse_error(&self, err: &ParseError) -> String {
        let hint_verb = match err {
            ParseError::UnknownCommand { input } => return self.unknown(input),
            ParseError::InvalidJson { .. } => Some(Verb::Call),
            ParseError::MalformedShorthand { .. } => Some(Verb::Shorthand),
            ParseError::ConflictingAuthFlags | ParseError::InvalidUrl { .. } => Some(Verb::Connect),
            ParseError::MissingArgument { verb, .. } => Verb::from_keyword(verb),
        };
        match hint_verb {
            Some(verb) => format!("❌ Error: {err}\n\nUsage: `{}`", usage(verb)),
            None => format!("❌ Error: {err}"),
        }
    }

    /// Non-fatal parse warnings, appended after a reply.
    pub fn warnings(&self, warnings: &[String]) -> String {
        warnings
            .iter()
            .map(|w| format!("⚠️ {w}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn not_connected(state: SessionState) -> String {
    match state {
        SessionState::Connecting => {
            "❌ A connection is still being established.\n\nWait for it to finish, then try again."
                .to_string()
        }
        SessionState::Failed => format!(
            "{NOT_CONNECTED}\n\nThe last connection attempt failed; use `status` to see why."
        ),
        _ => NOT_CONNECTED.to_string(),
    }
}

fn validation_failed(diagnostics: &ValidationDiagnostics) -> String {
    let mut out = format!(
        "❌ Parameter validation error for tool '{}':\n",
        diagnostics.tool_name
    );

    if !diagnostics.missing.is_empty() {
        out.push_str("\nMissing required parameters:\n");
        for param in &diagnostics.missing {
            out.push_str(&format!("- `{}`: {}", param.name, param.ty));
            if let Some(ref description) = param.description {
                out.push_str(&format!(" - {description}"));
            }
            out.push('\n');
        }
    }

    if !diagnostics.type_errors.is_empty() {
        out.push_str("\nInvalid values:\n");
        for issue in &diagnostics.type_errors {
            out.push_str(&format!("- {issue}\n"));
        }
    }

    for warning in &diagnostics.warnings {
        out.push_str(&format!("\n⚠️ {warning}"));
    }

    out.push_str(&format!("\nExample usage:\n```\n{}\n```", diagnostics.example));
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
