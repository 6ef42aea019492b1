//! Export orchestration.
//!
//! Walks every conversation in listing order and takes it through
//! fetch, filter, render, name and write. A failed fetch abandons the
//! current conversation only.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use tempfile::NamedTempFile;

use crate::domain::{
    AppError, Conversation, ExportConfig, ExportSummary, MessageKind, Participant, Result,
};
use crate::infrastructure::{GraphClient, Templates, Transport};

use super::asset_cache::AssetCache;
use super::name_resolver::resolve_name;
use super::output_path::resolve_output_path;
use super::renderer::Renderer;

/// Why a conversation produced no document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SkipListed,
    NotInAllowList,
    EmptyName,
    NoMessages,
    NothingRendered,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SkipListed => write!(f, "on the skip list"),
            Self::NotInAllowList => write!(f, "not in the allow list"),
            Self::EmptyName => write!(f, "no resolvable name"),
            Self::NoMessages => write!(f, "no messages"),
            Self::NothingRendered => write!(f, "no renderable messages"),
        }
    }
}

/// Result of exporting one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written(PathBuf),
    Skipped(SkipReason),
}

/// Drives one export run.
pub struct Exporter<'a, T> {
    client: &'a GraphClient<T>,
    config: &'a ExportConfig,
    templates: &'a Templates,
    cache: AssetCache,
}

impl<'a, T: Transport> Exporter<'a, T> {
    #[must_use]
    pub fn new(client: &'a GraphClient<T>, config: &'a ExportConfig, templates: &'a Templates) -> Self {
        Self {
            client,
            config,
            templates,
            cache: AssetCache::new(config.assets_dir()),
        }
    }

    /// Exports every conversation of the signed-in user.
    ///
    /// # Errors
    /// Returns error if the output directory cannot be created or if the
    /// signed-in user or the conversation list cannot be fetched. Failures
    /// inside a single conversation are logged and counted instead.
    pub async fn run(&mut self) -> Result<ExportSummary> {
        fs::create_dir_all(&self.config.output_dir).map_err(|e| {
            AppError::io(
                format!(
                    "Failed to create directory {}",
                    self.config.output_dir.display()
                ),
                e,
            )
        })?;

        let current_user = self.client.current_user().await?;
        tracing::info!("Signed in as {}", current_user.display_name);

        let conversations = self.client.list_conversations().await?;
        let mut summary = ExportSummary::default();

        for conversation in &conversations {
            match self
                .export_conversation(conversation, &current_user, &mut summary)
                .await
            {
                Ok(Outcome::Written(path)) => {
                    println!("{} {}", "✓".green(), path.display());
                    summary.written.push(path);
                }
                Ok(Outcome::Skipped(reason)) => {
                    tracing::info!("Skipped {}: {}", conversation.id, reason);
                    println!("{} {} ({})", "-".yellow(), conversation.id, reason);
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to export {}: {}", conversation.id, e);
                    println!("{} {}: {}", "✗".red(), conversation.id, e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Exports one conversation.
    ///
    /// # Errors
    /// Returns `RemoteFetch` if members or messages cannot be fetched, or an
    /// IO error if the document cannot be written.
    pub async fn export_conversation(
        &mut self,
        conversation: &Conversation,
        current_user: &Participant,
        summary: &mut ExportSummary,
    ) -> Result<Outcome> {
        if self.config.is_skipped(&conversation.id) {
            return Ok(Outcome::Skipped(SkipReason::SkipListed));
        }

        let members = self.client.list_members(conversation).await?;
        let name = resolve_name(conversation, &members, current_user);

        if name.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::EmptyName));
        }
        if !self.config.admits(&conversation.id, &name) {
            return Ok(Outcome::Skipped(SkipReason::NotInAllowList));
        }

        let messages = self.client.list_messages(conversation).await?;
        if messages.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::NoMessages));
        }

        tracing::info!(
            "Rendering {} ({} messages, {} members)",
            name,
            messages.len(),
            members.len()
        );

        for user_id in members.iter().filter_map(|m| m.user_id.as_deref()) {
            let _ = self.cache.get_asset(self.client, user_id).await;
        }

        let renderer = Renderer::new(self.templates, current_user);
        let mut fragments = Vec::with_capacity(messages.len());
        for message in &messages {
            if matches!(message.kind, MessageKind::Unhandled(_)) {
                summary.unhandled_messages += 1;
            }
            if let Some(fragment) = renderer
                .render_message(message, self.client, &mut self.cache)
                .await
            {
                fragments.push(fragment);
            }
        }

        if fragments.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::NothingRendered));
        }

        let document = renderer.render_document(&name, &fragments);
        let path = resolve_output_path(
            &self.config.output_dir,
            conversation,
            &name,
            self.config.avoid_overwrite,
        );
        write_document(&path, &document)?;

        Ok(Outcome::Written(path))
    }
}

/// Writes through a temporary file so an interrupted run leaves no partial document.
fn write_document(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| AppError::io("Failed to create temporary file", e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| AppError::io("Failed to write document", e))?;
    tmp.persist(path).map_err(|e| {
        AppError::io(format!("Failed to write {}", path.display()), e.error)
    })?;

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}
