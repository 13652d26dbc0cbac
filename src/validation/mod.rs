//! Parameter Validator — required checks, default filling, type coercion
//! and constraint checks, plus example-call synthesis for diagnostics.

pub mod coerce;
pub mod example;
pub mod types;
pub mod validator;

pub use example::example_call;
pub use types::{MissingParam, ValidationDiagnostics, ValidationIssue, ValidationResult};
pub use validator::validate;
