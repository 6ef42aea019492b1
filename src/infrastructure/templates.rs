//! Conversation and message templates.
//!
//! Built-in defaults are compiled in; a directory holding `conversation.html`,
//! `message.html` and `style.css` replaces any of them.

use std::fs;
use std::path::Path;

use crate::domain::{AppError, Result};

const CONVERSATION_FILE: &str = "conversation.html";
const MESSAGE_FILE: &str = "message.html";
const STYLESHEET_FILE: &str = "style.css";

const DEFAULT_CONVERSATION: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{name}}</title>
<style>
{{style}}
</style>
</head>
<body>
<header><h1>{{name}}</h1></header>
<main class="messages">
{{messages}}
</main>
</body>
</html>
"#;

const DEFAULT_MESSAGE: &str = r#"<article class="message" data-me="{{is_me}}" data-deleted="{{deleted}}" data-edited="{{edited}}" data-importance="{{importance}}">
<img class="avatar" src="{{avatar}}" alt="">
<div class="bubble">
<div class="meta"><span class="sender">{{sender}}</span> <time>{{timestamp}}</time></div>
<div class="body">{{body}}</div>
<div class="attachments">{{attachments}}</div>
</div>
</article>
"#;

const DEFAULT_STYLESHEET: &str = r#"body { font-family: "Segoe UI", system-ui, sans-serif; background: #f5f5f5; margin: 0; }
header { background: #464775; color: #fff; padding: 0.75rem 1.5rem; }
header h1 { font-size: 1.25rem; margin: 0; }
.messages { max-width: 56rem; margin: 0 auto; padding: 1rem; }
.message { display: flex; gap: 0.5rem; margin: 0.5rem 0; }
.message[data-me="true"] { flex-direction: row-reverse; }
.message[data-me="true"] .bubble { background: #e8ebfa; }
.avatar { width: 32px; height: 32px; border-radius: 50%; object-fit: cover; }
.avatar[src=""] { visibility: hidden; }
.bubble { background: #fff; border-radius: 4px; padding: 0.5rem 0.75rem; max-width: 75%; }
.meta { font-size: 0.75rem; color: #616161; margin-bottom: 0.25rem; }
.body img { max-width: 100%; }
.message[data-deleted="true"] .body::before { content: "This message has been deleted."; font-style: italic; color: #616161; }
.message[data-edited="true"] .meta::after { content: " (edited)"; }
.message[data-importance="high"] .bubble { border-left: 3px solid #c4314b; }
.message[data-importance="urgent"] .bubble { border-left: 3px solid #c4314b; background: #fde7e9; }
.attachments a { display: block; font-size: 0.875rem; }
.attachments:empty { display: none; }
"#;

/// The three documents the renderer fills in.
#[derive(Debug, Clone)]
pub struct Templates {
    pub conversation: String,
    pub message: String,
    pub stylesheet: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            conversation: DEFAULT_CONVERSATION.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
        }
    }
}

impl Templates {
    /// Loads templates from `dir`, falling back to the defaults for missing files.
    ///
    /// # Errors
    /// Returns error if a file exists but cannot be read, or if the
    /// conversation template has no `{{messages}}` placeholder.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut templates = Self::default();

        if let Some(dir) = dir {
            if let Some(content) = read_optional(&dir.join(CONVERSATION_FILE))? {
                templates.conversation = content;
            }
            if let Some(content) = read_optional(&dir.join(MESSAGE_FILE))? {
                templates.message = content;
            }
            if let Some(content) = read_optional(&dir.join(STYLESHEET_FILE))? {
                templates.stylesheet = content;
            }
        }

        if !templates.conversation.contains("{{messages}}") {
            return Err(AppError::Template {
                message: format!("{CONVERSATION_FILE} has no {{{{messages}}}} placeholder"),
            });
        }

        Ok(templates)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    tracing::debug!("Loading template {}", path.display());
    fs::read_to_string(path)
        .map(Some)
        .map_err(|e| AppError::io(format!("Failed to read template {}", path.display()), e))
}
