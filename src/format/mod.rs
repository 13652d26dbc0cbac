//! Result Formatter — renders every reply the relay sends back.

pub mod formatter;
pub mod payload;
mod schema;

pub use formatter::{ResultFormatter, DEFAULT_PAYLOAD_CHAR_BUDGET, DEFAULT_SCHEMA_CHAR_BUDGET};
pub use payload::{render_payload, RenderedPayload};
