//! HTML rendering of messages and conversation documents.
//!
//! Templates are plain text with a fixed set of `{{placeholder}}` tokens.
//! Values are substituted in one pass, so markup inserted for one token is
//! never scanned for another.

use std::ops::Range;

use crate::domain::{Attachment, EventDetail, Message, MessageKind, Participant};
use crate::infrastructure::{GraphClient, Templates, Transport};

use super::asset_cache::{asset_href, AssetCache};

/// Sender label for system events.
pub const SYSTEM_SENDER: &str = "System";

const UNKNOWN_SENDER: &str = "Unknown user";

/// Renders messages for one signed-in user.
pub struct Renderer<'a> {
    templates: &'a Templates,
    current_user: &'a Participant,
}

impl<'a> Renderer<'a> {
    #[must_use]
    pub const fn new(templates: &'a Templates, current_user: &'a Participant) -> Self {
        Self {
            templates,
            current_user,
        }
    }

    /// Renders one message into a fragment of the message template.
    ///
    /// Returns `None` for unhandled kinds and for content messages that have
    /// neither a body nor attachments.
    pub async fn render_message<T: Transport>(
        &self,
        message: &Message,
        client: &GraphClient<T>,
        cache: &mut AssetCache,
    ) -> Option<String> {
        match &message.kind {
            MessageKind::Content => self.render_content(message, client, cache).await,
            MessageKind::SystemEvent(event) => Some(self.render_event(message, event)),
            MessageKind::Unhandled(kind) => {
                tracing::warn!(
                    "Skipping message {} in {}: unhandled message type '{}'",
                    message.id,
                    message.conversation_id,
                    kind
                );
                None
            }
        }
    }

    async fn render_content<T: Transport>(
        &self,
        message: &Message,
        client: &GraphClient<T>,
        cache: &mut AssetCache,
    ) -> Option<String> {
        if message.body.trim().is_empty()
            && message.attachments.is_empty()
            && message.deleted_at.is_none()
        {
            tracing::debug!("Dropping empty message {}", message.id);
            return None;
        }

        let body = rewrite_embedded_images(&message.body, client, cache).await;

        let sender = message
            .sender
            .as_ref()
            .map(|s| s.display_name.as_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_SENDER);

        let avatar = match message.sender.as_ref().and_then(|s| s.user_id.as_deref()) {
            Some(user_id) => cache
                .get_asset(client, user_id)
                .await
                .map(|path| asset_href(&path))
                .unwrap_or_default(),
            None => String::new(),
        };

        let is_me = sender == self.current_user.display_name;

        Some(fill(
            &self.templates.message,
            &[
                ("attachments", render_attachments(&message.attachments).as_str()),
                ("body", body.as_str()),
                ("timestamp", format_timestamp(message).as_str()),
                ("deleted", bool_str(message.deleted_at.is_some())),
                ("edited", bool_str(message.edited_at.is_some())),
                ("avatar", escape_html(&avatar).as_str()),
                ("is_me", bool_str(is_me)),
                ("sender", escape_html(sender).as_str()),
                ("importance", message.importance.to_string().as_str()),
            ],
        ))
    }

    fn render_event(&self, message: &Message, event: &EventDetail) -> String {
        let body = format!(
            "<em class=\"event\">{}</em>",
            escape_html(&event.describe())
        );

        fill(
            &self.templates.message,
            &[
                ("attachments", ""),
                ("body", body.as_str()),
                ("timestamp", format_timestamp(message).as_str()),
                ("deleted", "false"),
                ("edited", "false"),
                ("avatar", ""),
                ("is_me", "false"),
                ("sender", SYSTEM_SENDER),
                ("importance", message.importance.to_string().as_str()),
            ],
        )
    }

    /// Assembles a conversation document from rendered fragments.
    #[must_use]
    pub fn render_document(&self, name: &str, fragments: &[String]) -> String {
        fill(
            &self.templates.conversation,
            &[
                ("name", escape_html(name).as_str()),
                ("style", self.templates.stylesheet.as_str()),
                ("messages", fragments.concat().as_str()),
            ],
        )
    }
}

/// Replaces `{{name}}` tokens with their values in a single pass.
///
/// Unknown tokens are left as they are.
#[must_use]
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// Points every inline image served by the API at its cached copy.
///
/// Images that cannot be downloaded keep their remote source.
async fn rewrite_embedded_images<T: Transport>(
    body: &str,
    client: &GraphClient<T>,
    cache: &mut AssetCache,
) -> String {
    let sources = image_sources(body);
    if sources.is_empty() {
        return body.to_string();
    }

    let mut out = String::with_capacity(body.len());
    let mut copied = 0;

    for range in sources {
        let url = body[range.clone()].replace("&amp;", "&");
        if !client.is_hosted_content(&url) {
            continue;
        }

        if let Some(path) = cache.get_embedded_image(client, &url).await {
            out.push_str(&body[copied..range.start]);
            out.push_str(&asset_href(&path));
            copied = range.end;
        }
    }

    out.push_str(&body[copied..]);
    out
}

/// Byte ranges of the `src` values of every `<img>` tag.
fn image_sources(markup: &str) -> Vec<Range<usize>> {
    let lower = markup.to_ascii_lowercase();
    let mut found = Vec::new();
    let mut from = 0;

    while let Some(offset) = lower[from..].find("<img") {
        let tag_start = from + offset;
        let tag_end = lower[tag_start..]
            .find('>')
            .map_or(lower.len(), |i| tag_start + i);

        if let Some(range) = src_value(&lower[tag_start..tag_end]) {
            found.push(tag_start + range.start..tag_start + range.end);
        }
        from = tag_end;
    }

    found
}

/// Range of the `src` attribute value inside one lowercased tag.
fn src_value(tag: &str) -> Option<Range<usize>> {
    let bytes = tag.as_bytes();
    let mut search = 0;

    while let Some(offset) = tag[search..].find("src") {
        let name_start = search + offset;
        search = name_start + 3;

        let preceded_by_space = name_start > 0 && bytes[name_start - 1].is_ascii_whitespace();
        if !preceded_by_space {
            continue;
        }

        let mut i = name_start + 3;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }

        return match bytes[i] {
            quote @ (b'"' | b'\'') => {
                let start = i + 1;
                let len = tag[start..].find(char::from(quote))?;
                Some(start..start + len)
            }
            _ => {
                let len = tag[i..]
                    .find(|c: char| c.is_ascii_whitespace())
                    .unwrap_or(tag.len() - i);
                Some(i..i + len)
            }
        };
    }

    None
}

fn render_attachments(attachments: &[Attachment]) -> String {
    attachments
        .iter()
        .map(|attachment| {
            let label = attachment
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(&attachment.content_type);

            match &attachment.content_url {
                Some(url) => format!(
                    "<a class=\"attachment\" href=\"{}\">{}</a>",
                    escape_html(url),
                    escape_html(label)
                ),
                None => format!("<span class=\"attachment\">{}</span>", escape_html(label)),
            }
        })
        .collect()
}

fn format_timestamp(message: &Message) -> String {
    message
        .created_at
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

const fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Escapes text for use in element content and quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
