//! Domain layer - core types and errors.
//!
//! This layer contains pure domain models, configuration and error types.
//! Nothing here performs I/O; client errors are carried as boxed sources.

pub mod config;
pub mod error;
pub mod models;

pub use config::{ExportConfig, FileConfig};
pub use error::{AppError, Result};
pub use models::{
    Attachment, Conversation, ConversationKind, EventDetail, ExportSummary, Importance, Message,
    MessageKind, Participant,
};
