//! Application layer - use cases and orchestration.
//!
//! This layer contains the export pipeline: naming, asset caching,
//! rendering and the per-conversation orchestration.

pub mod asset_cache;
pub mod exporter;
pub mod name_resolver;
pub mod output_path;
pub mod renderer;

pub use exporter::Exporter;
