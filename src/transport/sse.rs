//! Server-sent events parsing for streamable HTTP responses.
//!
//! Splits a byte stream on SSE event boundaries (blank line), joins each
//! event's `data:` lines and parses them as one JSON message.

use std::fmt::Display;

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;

use super::errors::TransportFault;

/// Turn an SSE byte stream into a stream of JSON messages.
///
/// Events without data (keep-alives, comments) and events whose data is not
/// JSON are skipped. A read error is yielded once and ends the stream.
pub fn sse_messages<S, B, E>(byte_stream: S) -> impl Stream<Item = Result<Value, TransportFault>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    stream::unfold(
        Some((byte_stream, Vec::<u8>::new())),
        |state| async move {
            let (mut byte_stream, mut buffer) = state?;
            loop {
                if let Some((event, rest)) = split_event(&buffer) {
                    buffer = rest;
                    match event_data(&event) {
                        Some(data) => match serde_json::from_str::<Value>(&data) {
                            Ok(msg) => return Some((Ok(msg), Some((byte_stream, buffer)))),
                            Err(e) => {
                                tracing::debug!(error = %e, "skipping non-JSON SSE event");
                                continue;
                            }
                        },
                        None => continue,
                    }
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(bytes.as_ref()),
                    Some(Err(e)) => {
                        let fault = TransportFault::Protocol {
                            reason: format!("event stream read error: {e}"),
                        };
                        return Some((Err(fault), None));
                    }
                    None => {
                        // Trailing event without a final blank line
                        let tail = String::from_utf8_lossy(&buffer).to_string();
                        let msg = event_data(&tail)
                            .and_then(|data| serde_json::from_str::<Value>(&data).ok())?;
                        return Some((Ok(msg), None));
                    }
                }
            }
        },
    )
}

/// Split off the first complete event (`\n\n` or `\r\n\r\n` terminated).
fn split_event(buffer: &[u8]) -> Option<(String, Vec<u8>)> {
    let boundary = |sep: &[u8]| {
        buffer
            .windows(sep.len())
            .position(|w| w == sep)
            .map(|pos| (pos, sep.len()))
    };
    let (pos, len) = match (boundary(b"\n\n"), boundary(b"\r\n\r\n")) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let event = String::from_utf8_lossy(&buffer[..pos]).to_string();
    Some((event, buffer[pos + len..].to_vec()))
}

/// Concatenated `data:` payload of one event, if any.
fn event_data(event: &str) -> Option<String> {
    let data: Vec<&str> = event
        .lines()
        .filter_map(|line| {
            line.strip_prefix("data: ")
                .or_else(|| line.strip_prefix("data:"))
        })
        .map(str::trim)
        .collect();
    let joined = data.join("\n");
    (!joined.trim().is_empty()).then_some(joined)
}
