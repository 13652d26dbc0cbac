//! Static help text for the command grammar.

use super::phrases::PHRASES;
use super::types::Verb;

/// One-line usage for a verb.
pub fn usage(verb: Verb) -> &'static str {
    match verb {
        Verb::Connect => "connect <url> [--token TOKEN | --token-env-var VAR]",
        Verb::Disconnect => "disconnect",
        Verb::List => "list",
        Verb::Call => "call <tool_name> <json_object>",
        Verb::Shorthand => "shorthand <tool_name> [key=value ...]",
        Verb::Schema => "schema <tool_name>",
        Verb::Status => "status",
        Verb::Help => "help [command]",
        Verb::Unknown => "",
    }
}

fn summary(verb: Verb) -> &'static str {
    match verb {
        Verb::Connect => "Connect this conversation to a tool server",
        Verb::Disconnect => "Disconnect from the current server",
        Verb::List => "List the tools the server exposes",
        Verb::Call => "Call a tool with JSON arguments (validated against its schema)",
        Verb::Shorthand => "Call a tool with key=value arguments (validated against its schema)",
        Verb::Schema => "Show a tool's parameters, constraints and an example call",
        Verb::Status => "Show the connection status",
        Verb::Help => "Show help for all commands or one command",
        Verb::Unknown => "",
    }
}

fn details(verb: Verb) -> &'static str {
    match verb {
        Verb::Connect => {
            "Examples:\n\
             ```\n\
             connect http://localhost:8000/mcp\n\
             connect https://tools.example.com/mcp --token my-auth-token\n\
             connect https://tools.example.com/mcp --token-env-var MCP_TOKEN\n\
             ```"
        }
        Verb::Call => {
            "Required parameters are checked, defaults are filled in, and values are\n\
             coerced to the declared types before the tool is called.\n\n\
             Example:\n\
             ```\n\
             call search-models {\"query\": \"stable-diffusion\"}\n\
             ```"
        }
        Verb::Shorthand => {
            "Values may be quoted to include spaces. They are converted to the\n\
             parameter types declared by the tool.\n\n\
             Example:\n\
             ```\n\
             shorthand search-models query=\"stable diffusion\" limit=5\n\
             ```"
        }
        Verb::Schema => {
            "Example:\n\
             ```\n\
             schema search-models\n\
             ```"
        }
        _ => "",
    }
}

/// Natural-language phrases that resolve to `verb`.
fn aliases(verb: Verb) -> Vec<&'static str> {
    PHRASES
        .iter()
        .filter(|(_, v)| *v == verb)
        .map(|(phrase, _)| *phrase)
        .collect()
}

/// Help for one topic, or the overview when `topic` is `None`.
pub fn help_text(topic: Option<&str>) -> String {
    match topic {
        None => overview(),
        Some(t) => match Verb::from_keyword(t) {
            Some(verb) => verb_help(verb),
            None => format!("Unknown command: `{t}`\n\n{}", overview()),
        },
    }
}

fn verb_help(verb: Verb) -> String {
    let mut out = format!("**{}**\n{}.", usage(verb), summary(verb));
    let details = details(verb);
    if !details.is_empty() {
        out.push_str("\n\n");
        out.push_str(details);
    }
    let aliases = aliases(verb);
    if !aliases.is_empty() {
        out.push_str("\n\nAlso understood: ");
        out.push_str(
            &aliases
                .iter()
                .map(|a| format!("\"{a}\""))
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    out
}

fn overview() -> String {
    let mut out = String::from("**Available commands**\n\n");
    for verb in Verb::STRUCTURED {
        out.push_str(&format!("- **{}**\n  {}\n", usage(verb), summary(verb)));
    }
    out.push_str("\nUse `help <command>` for details on a specific command.");
    out
}
