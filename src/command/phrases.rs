//! Phrase-to-verb normalization: stage one of command recognition.
//!
//! Maps the leading words of a line onto a [`Verb`] and hands back the
//! remainder for the structured parser. The structured keywords are checked
//! first; a natural-language phrase is only consulted when no keyword matched,
//! or when it extends the matched keyword with filler words ("connect *to*",
//! "list *tools*") that resolve to the same verb.

use super::types::Verb;

// ─── Phrase Table ────────────────────────────────────────────────────────────

/// Fixed natural-language phrases, matched word-by-word and case-insensitively.
pub const PHRASES: &[(&str, Verb)] = &[
    ("connect to", Verb::Connect),
    ("connect me to", Verb::Connect),
    ("open connection to", Verb::Connect),
    ("disconnect from", Verb::Disconnect),
    ("close connection", Verb::Disconnect),
    ("log out", Verb::Disconnect),
    ("list tools", Verb::List),
    ("list all tools", Verb::List),
    ("show tools", Verb::List),
    ("show me the tools", Verb::List),
    ("what tools are available", Verb::List),
    ("available tools", Verb::List),
    ("call tool", Verb::Call),
    ("run tool", Verb::Call),
    ("invoke tool", Verb::Call),
    ("invoke", Verb::Call),
    ("run", Verb::Call),
    ("schema for", Verb::Schema),
    ("schema of", Verb::Schema),
    ("show schema for", Verb::Schema),
    ("show schema of", Verb::Schema),
    ("describe tool", Verb::Schema),
    ("describe", Verb::Schema),
    ("connection status", Verb::Status),
    ("show status", Verb::Status),
    ("am i connected", Verb::Status),
    ("what can you do", Verb::Help),
    ("show help", Verb::Help),
    ("commands", Verb::Help),
];

/// Legacy marker accepted in front of a structured keyword (`!connect`).
const COMMAND_MARKER: char = '!';

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Resolve the verb of `text` and return it with the unconsumed remainder.
///
/// Returns `None` when neither a keyword nor a phrase matches.
pub fn resolve_verb(text: &str) -> Option<(Verb, &str)> {
    let text = text.trim();
    let (first, after_first) = split_first_word(text);
    let keyword = first.strip_prefix(COMMAND_MARKER).unwrap_or(first);

    // (a) structured keyword on the leading token
    if let Some(verb) = Verb::from_keyword(keyword) {
        let filler = PHRASES
            .iter()
            .filter(|(phrase, v)| *v == verb && phrase.split_whitespace().count() > 1)
            .filter_map(|(phrase, _)| {
                strip_phrase(text, phrase).map(|rest| (phrase.split_whitespace().count(), rest))
            })
            .filter(|(_, rest)| filler_applies(verb, rest))
            .max_by_key(|(words, _)| *words);

        return Some(match filler {
            Some((_, rest)) => (verb, rest),
            None => (verb, after_first),
        });
    }

    // (b) natural-language phrase, longest first
    PHRASES
        .iter()
        .filter_map(|(phrase, verb)| {
            strip_phrase(text, phrase).map(|rest| (phrase.split_whitespace().count(), *verb, rest))
        })
        .max_by_key(|(words, _, _)| *words)
        .map(|(_, verb, rest)| (verb, rest))
}

/// Whether stripping filler after a keyword leaves something the verb can use.
///
/// `list tools` and `disconnect from` need no remainder; verbs that take a
/// target must keep one, and a JSON body is never mistaken for a tool name.
fn filler_applies(verb: Verb, rest: &str) -> bool {
    match verb {
        Verb::Connect | Verb::Call | Verb::Shorthand | Verb::Schema => {
            !rest.is_empty() && !rest.starts_with('{')
        }
        _ => true,
    }
}

/// Match `phrase` against the leading words of `text`.
///
/// Words compare case-insensitively with trailing `?`/`.` ignored, so
/// "Am I connected?" still matches. Returns the trimmed remainder.
fn strip_phrase<'a>(text: &'a str, phrase: &str) -> Option<&'a str> {
    let mut rest = text;
    for expected in phrase.split_whitespace() {
        let (word, after) = split_first_word(rest);
        let word = word.trim_end_matches(['?', '.']);
        if word.is_empty() || !word.eq_ignore_ascii_case(expected) {
            return None;
        }
        rest = after;
    }
    Some(rest)
}

/// Split off the first whitespace-delimited word; the remainder is left-trimmed.
pub(crate) fn split_first_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim_start()),
        None => (text, ""),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_keyword_wins() {
        assert_eq!(resolve_verb("status"), Some((Verb::Status, "")));
        assert_eq!(resolve_verb("!LIST"), Some((Verb::List, "")));
        assert_eq!(
            resolve_verb("schema search-models"),
            Some((Verb::Schema, "search-models"))
        );
    }

    #[test]
    fn test_keyword_filler_is_stripped() {
        assert_eq!(
            resolve_verb("connect to http://localhost:8000"),
            Some((Verb::Connect, "http://localhost:8000"))
        );
        assert_eq!(resolve_verb("List Tools"), Some((Verb::List, "")));
        assert_eq!(
            resolve_verb("call tool search {\"q\": 1}"),
            Some((Verb::Call, "search {\"q\": 1}"))
        );
    }

    #[test]
    fn test_filler_not_applied_when_it_would_eat_the_target() {
        // A tool literally called "tool" followed by its JSON body.
        assert_eq!(
            resolve_verb("call tool {}"),
            Some((Verb::Call, "tool {}"))
        );
    }

    #[test]
    fn test_phrase_without_keyword() {
        assert_eq!(resolve_verb("show tools"), Some((Verb::List, "")));
        assert_eq!(resolve_verb("Am I connected?"), Some((Verb::Status, "")));
        assert_eq!(
            resolve_verb("describe tool get-model-info"),
            Some((Verb::Schema, "get-model-info"))
        );
        assert_eq!(
            resolve_verb("show schema for search-models"),
            Some((Verb::Schema, "search-models"))
        );
    }

    #[test]
    fn test_longest_phrase_wins() {
        // "invoke tool x" must not leave "tool" as the target.
        assert_eq!(resolve_verb("invoke tool x"), Some((Verb::Call, "x")));
        assert_eq!(resolve_verb("invoke x"), Some((Verb::Call, "x")));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(resolve_verb("hello there"), None);
        assert_eq!(resolve_verb(""), None);
        assert_eq!(resolve_verb("   "), None);
    }

    #[test]
    fn test_split_first_word() {
        assert_eq!(split_first_word("  call  x  y"), ("call", "x  y"));
        assert_eq!(split_first_word("solo"), ("solo", ""));
        assert_eq!(split_first_word(""), ("", ""));
    }
}
