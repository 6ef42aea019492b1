//! Infrastructure layer - external adapters (HTTP, auth, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod auth;
pub mod config;
pub mod graph_client;
pub mod parser;
pub mod templates;
pub mod transport;

pub use auth::{DeviceCodeProvider, StaticToken, TokenProvider};
pub use config::load_config;
pub use graph_client::GraphClient;
pub use templates::Templates;
pub use transport::{HttpTransport, Transport};
