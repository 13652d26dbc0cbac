//! Tool Invoker — validated tool calls over a connected session.

pub mod invoke;
pub mod types;

pub use invoke::ToolInvoker;
pub use types::{ToolCallError, ToolCallResult};
