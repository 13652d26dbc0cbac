//! Session Manager — per-conversation connection lifecycle and tool catalog.

pub mod catalog;
pub mod errors;
pub mod manager;
pub mod types;

pub use catalog::ToolCatalog;
pub use errors::SessionError;
pub use manager::{InvokeLease, SessionManager};
pub use types::{ConnectSummary, SessionState, SessionStatus, SkippedTool};
