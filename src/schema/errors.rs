//! Schema normalization error types.

use thiserror::Error;

/// Why a raw tool descriptor could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// The descriptor, or its schema root, is not an object schema.
    #[error("schema is not an object: found {found}")]
    NotAnObject { found: String },

    /// No adapter could locate a schema root in the descriptor.
    #[error("unsupported schema shape: {reason}")]
    UnsupportedSchemaShape { reason: String },
}
