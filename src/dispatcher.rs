//! Dispatcher: routes one line of chat text to the component that handles it.
//!
//! The only place that knows about every component: it parses the text,
//! calls the session manager or the tool invoker, and hands the outcome to
//! the formatter. Every path ends in a reply string; nothing here fails.

use std::sync::Arc;

use crate::command::{parse, ParseError, ParsedCommand, Verb};
use crate::config::RelayConfig;
use crate::format::ResultFormatter;
use crate::invoker::ToolInvoker;
use crate::session::SessionManager;
use crate::transport::Connector;

pub struct Dispatcher {
    sessions: Arc<SessionManager>,
    invoker: ToolInvoker,
    formatter: ResultFormatter,
    default_endpoint: Option<String>,
}

impl Dispatcher {
    /// Wire every component from `config` around `connector`.
    pub fn new(config: &RelayConfig, connector: Arc<dyn Connector>) -> Self {
        let sessions = Arc::new(
            SessionManager::new(connector, config.connect_timeout())
                .with_suggestion_max_distance(config.suggestion_max_distance),
        );
        Self {
            invoker: ToolInvoker::new(sessions.clone(), config.call_timeout()),
            sessions,
            formatter: ResultFormatter::new(config.payload_char_budget, config.schema_char_budget),
            default_endpoint: config.default_endpoint.clone(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Handle one line of input for the conversation `key`.
    pub async fn handle(&self, key: &str, text: &str) -> String {
        let command = parse(text);
        tracing::debug!(key, verb = %command.verb, target = ?command.target, "dispatching");

        let reply = self.route(key, &command).await;
        if command.raw_args.warnings.is_empty() {
            reply
        } else {
            format!("{reply}\n\n{}", self.formatter.warnings(&command.raw_args.warnings))
        }
    }

    async fn route(&self, key: &str, command: &ParsedCommand) -> String {
        let fmt = &self.formatter;
        match command.verb {
            Verb::Unknown => match command.error() {
                Some(err) => fmt.parse_error(err),
                None => fmt.unknown(&command.source_text),
            },
            Verb::Connect => {
                let Some(endpoint) = command.target.as_ref().or(self.default_endpoint.as_ref()) else {
                    return fmt.parse_error(&ParseError::MissingArgument {
                        verb: Verb::Connect.to_string(),
                        what: "server URL".to_string(),
                    });
                };
                match self
                    .sessions
                    .connect(key, endpoint, command.raw_args.auth.as_ref())
                    .await
                {
                    Ok(summary) => fmt.connected(&summary),
                    Err(e) => fmt.session_error(&e),
                }
            }
            Verb::Disconnect => match self.sessions.disconnect(key).await {
                Ok(previous) => fmt.disconnected(previous),
                Err(e) => fmt.session_error(&e),
            },
            Verb::List => match self.sessions.list_tools(key) {
                Ok(tools) => fmt.tool_list(&tools),
                Err(e) => fmt.session_error(&e),
            },
            Verb::Call | Verb::Shorthand => {
                let Some(ref tool) = command.target else {
                    return fmt.parse_error(&ParseError::MissingArgument {
                        verb: command.verb.to_string(),
                        what: "tool name".to_string(),
                    });
                };
                let result = self.invoker.invoke(key, tool, &command.raw_args.values).await;
                fmt.tool_result(&result)
            }
            Verb::Schema => {
                let Some(ref tool) = command.target else {
                    return fmt.parse_error(&ParseError::MissingArgument {
                        verb: Verb::Schema.to_string(),
                        what: "tool name".to_string(),
                    });
                };
                match self.sessions.lookup_tool(key, tool) {
                    Ok(descriptor) => fmt.schema(&descriptor),
                    Err(e) => fmt.session_error(&e),
                }
            }
            Verb::Status => fmt.status(&self.sessions.status(key)),
            Verb::Help => fmt.help(command.target.as_deref()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
