//! CLI interface using clap.
//!
//! Provides command-line arguments and merges them with the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::{AppError, ExportConfig, FileConfig, Result};

/// Tenant used when none is configured: any work or school account.
const DEFAULT_TENANT: &str = "organizations";

/// Teams Chat Export - Save Microsoft Teams chats as static HTML files.
#[derive(Parser, Debug)]
#[command(name = "teams-chat-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to write the HTML files to (default: ./teams-export).
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to a configuration file.
    /// Defaults to $XDG_CONFIG_HOME/teams-chat-export/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Application (client) id used for device-code sign-in.
    #[arg(long, env = "TEAMS_EXPORT_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Directory (tenant) id used for device-code sign-in.
    #[arg(long, env = "TEAMS_EXPORT_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Pre-acquired Graph access token; skips the sign-in.
    #[arg(long, env = "TEAMS_EXPORT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Export only conversations with these names (comma-separated).
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Never export these conversation ids (comma-separated).
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub skip: Option<Vec<String>>,

    /// Keep existing files and write to "name (n).html" instead.
    #[arg(long)]
    pub avoid_overwrite: bool,

    /// Directory with conversation.html, message.html and style.css overrides.
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// How the transport obtains its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    DeviceCode { client_id: String, tenant_id: String },
}

impl Cli {
    /// Merges flags with the config file (CLI > config > default).
    #[must_use]
    pub fn export_config(&self, file: &FileConfig) -> ExportConfig {
        let defaults = ExportConfig::default();

        ExportConfig {
            output_dir: self
                .output_dir
                .clone()
                .or_else(|| file.output_dir.clone())
                .unwrap_or(defaults.output_dir),
            only: self.only.clone().or_else(|| file.only.clone()),
            skip: self
                .skip
                .clone()
                .or_else(|| file.skip.clone())
                .unwrap_or_default(),
            avoid_overwrite: self.avoid_overwrite || file.avoid_overwrite.unwrap_or(false),
            templates_dir: self.templates.clone().or_else(|| file.templates_dir.clone()),
            api_base: file.api_base.clone().unwrap_or(defaults.api_base),
            page_size: file.page_size.unwrap_or(defaults.page_size),
        }
    }

    /// Picks a static token if one is given, device-code sign-in otherwise.
    ///
    /// # Errors
    /// Returns `Config` if neither a token nor a client id is available.
    pub fn credentials(&self, file: &FileConfig) -> Result<Credentials> {
        if let Some(token) = self.token.clone().or_else(|| file.access_token.clone()) {
            return Ok(Credentials::Token(token));
        }

        let client_id = self
            .client_id
            .clone()
            .or_else(|| file.client_id.clone())
            .ok_or_else(|| AppError::Config {
                message: "No credentials. Pass --token, or --client-id for device-code sign-in."
                    .into(),
            })?;

        let tenant_id = self
            .tenant_id
            .clone()
            .or_else(|| file.tenant_id.clone())
            .unwrap_or_else(|| DEFAULT_TENANT.to_string());

        Ok(Credentials::DeviceCode {
            client_id,
            tenant_id,
        })
    }
}
