//! Command Parser — turns a line of chat text into a typed command.
//!
//! Recognition is a two-stage pipeline:
//! - `phrases`: table-driven phrase-to-verb normalization
//! - `parser`: one structured parser per verb over the remainder
//!
//! Parsing is pure and total. Problems ride along on the returned
//! [`ParsedCommand`] rather than being raised.

pub mod errors;
pub mod help;
pub mod parser;
pub mod phrases;
pub mod types;

pub use errors::ParseError;
pub use parser::parse;
pub use types::{AuthFlag, ParsedCommand, RawArgs, Verb};
