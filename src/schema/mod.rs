//! Schema Normalizer — canonical tool descriptors from heterogeneous backends.

pub mod errors;
pub mod normalizer;
pub mod types;

pub use errors::NormalizationError;
pub use normalizer::{normalize, normalize_schema};
pub use types::{
    CanonicalSchema, DescriptorSource, PropertySpec, PropertyType, RawToolDescriptor,
    SchemaProvider, ToolDescriptor,
};
