//! Export configuration.
//!
//! `FileConfig` mirrors the optional TOML file; `ExportConfig` is the
//! resolved set of options the pipeline runs with.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default Microsoft Graph endpoint.
pub const DEFAULT_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Default number of messages requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Options read from `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Export only conversations whose resolved name is listed.
    #[serde(default)]
    pub only: Option<Vec<String>>,
    /// Conversation ids never exported.
    #[serde(default)]
    pub skip: Option<Vec<String>>,
    #[serde(default)]
    pub avoid_overwrite: Option<bool>,
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// Resolved configuration for one export run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    /// When set, conversations whose name is not listed are skipped.
    pub only: Option<Vec<String>>,
    pub skip: Vec<String>,
    /// Probe ` (n)` suffixes instead of replacing an existing document.
    pub avoid_overwrite: bool,
    pub templates_dir: Option<PathBuf>,
    pub api_base: String,
    pub page_size: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("teams-export"),
            only: None,
            skip: Vec::new(),
            avoid_overwrite: false,
            templates_dir: None,
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ExportConfig {
    /// Directory holding cached profile pictures and inline images.
    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.output_dir.join("assets")
    }

    /// True when the allow-list and skip-list let the conversation through.
    #[must_use]
    pub fn admits(&self, conversation_id: &str, name: &str) -> bool {
        if self.is_skipped(conversation_id) {
            return false;
        }
        self.only
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == name))
    }

    /// True when the conversation id is on the skip-list.
    #[must_use]
    pub fn is_skipped(&self, conversation_id: &str) -> bool {
        self.skip.iter().any(|id| id == conversation_id)
    }
}
