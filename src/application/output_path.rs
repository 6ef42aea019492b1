//! File names for exported conversations.
//!
//! `{dir}/{name}[ ({hash})][ ({n})].html`: the hash keeps group chats with
//! the same member list apart, the counter protects existing files when
//! overwriting is disabled.

use std::path::{Path, PathBuf};

use crate::domain::{Conversation, ConversationKind};

use super::asset_cache::sha256_hex;

/// Longest sanitized name, in characters, before any suffix.
pub const MAX_NAME_CHARS: usize = 64;

/// Characters rejected by common filesystems.
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strips characters that are invalid in file names and truncates.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !INVALID_CHARS.contains(c) && !c.is_control())
        .take(MAX_NAME_CHARS)
        .collect();

    cleaned.trim().trim_end_matches('.').to_string()
}

/// First 8 hex characters of the SHA-256 of a conversation id.
#[must_use]
pub fn short_hash(conversation_id: &str) -> String {
    sha256_hex(conversation_id)[..8].to_string()
}

/// File stem for a conversation, hash suffix included.
#[must_use]
pub fn file_stem(conversation: &Conversation, name: &str) -> String {
    let mut stem = sanitize_name(name);

    if conversation.kind != ConversationKind::OneToOne {
        let hash = short_hash(&conversation.id);
        stem = if stem.is_empty() {
            hash
        } else {
            format!("{stem} ({hash})")
        };
    } else if stem.is_empty() {
        stem = short_hash(&conversation.id);
    }

    stem
}

/// Chooses where a conversation document is written.
///
/// With `avoid_overwrite`, the smallest free ` (n)` variant starting at 1 is
/// used when the plain path exists; otherwise the plain path is returned and
/// replaced on write.
#[must_use]
pub fn resolve_output_path(
    dir: &Path,
    conversation: &Conversation,
    name: &str,
    avoid_overwrite: bool,
) -> PathBuf {
    let stem = file_stem(conversation, name);
    let path = dir.join(format!("{stem}.html"));

    if !avoid_overwrite || !path.exists() {
        return path;
    }

    (1..)
        .map(|n| dir.join(format!("{stem} ({n}).html")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(path)
}
