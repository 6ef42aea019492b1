//! Domain models for exported chat data.
//!
//! These models represent the chats, members and messages fetched from the
//! remote service. They are read-only and rebuilt on every run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Kind of conversation as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationKind {
    /// Direct chat between two people.
    OneToOne,
    /// Multi-member chat.
    Group,
    /// Meeting chats and anything the service adds later.
    Other(String),
}

impl ConversationKind {
    /// Maps the service's `chatType` value.
    #[must_use]
    pub fn from_remote(value: &str) -> Self {
        match value {
            "oneOnOne" => Self::OneToOne,
            "group" => Self::Group,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A chat thread.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Stable remote identifier.
    pub id: String,
    /// One-to-one, group or other.
    pub kind: ConversationKind,
    /// Explicit topic, if the chat was given one.
    pub topic: Option<String>,
}

/// A chat member or message author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Remote user identifier (absent for guests without an account).
    pub user_id: Option<String>,
    /// Display name as shown by the service.
    pub display_name: String,
}

impl Participant {
    #[must_use]
    pub fn new(user_id: Option<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }

    /// True when both refer to the same account.
    ///
    /// Falls back to display-name equality when either side has no user id.
    #[must_use]
    pub fn is_same_person(&self, other: &Self) -> bool {
        match (&self.user_id, &other.user_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.display_name == other.display_name,
        }
    }
}

/// Importance flag set by the sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Importance {
    #[default]
    Normal,
    High,
    Urgent,
}

impl Importance {
    #[must_use]
    pub fn from_remote(value: Option<&str>) -> Self {
        match value {
            Some("high") => Self::High,
            Some("urgent") => Self::Urgent,
            _ => Self::Normal,
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

/// File or card attached to a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: String,
    pub content_type: String,
    pub content_url: Option<String>,
    pub name: Option<String>,
}

/// Structured detail of a system event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDetail {
    MembersAdded {
        initiator: Option<String>,
        members: Vec<String>,
    },
    MembersRemoved {
        initiator: Option<String>,
        members: Vec<String>,
    },
    ChatRenamed {
        initiator: Option<String>,
        name: Option<String>,
    },
    CallStarted {
        initiator: Option<String>,
    },
    CallEnded {
        duration: Option<String>,
    },
    MessagePinned {
        initiator: Option<String>,
    },
    MessageUnpinned {
        initiator: Option<String>,
    },
    /// Event type the exporter has no wording for.
    Other {
        event_type: String,
        initiator: Option<String>,
    },
}

impl EventDetail {
    /// Human readable description of the event.
    #[must_use]
    pub fn describe(&self) -> String {
        let who = |initiator: &Option<String>| {
            initiator
                .clone()
                .unwrap_or_else(|| "Someone".to_string())
        };

        match self {
            Self::MembersAdded { initiator, members } => {
                format!("{} added {}", who(initiator), join_or(members, "members"))
            }
            Self::MembersRemoved { initiator, members } => {
                format!("{} removed {}", who(initiator), join_or(members, "members"))
            }
            Self::ChatRenamed { initiator, name } => match name {
                Some(name) => format!("{} renamed the chat to \"{name}\"", who(initiator)),
                None => format!("{} removed the chat name", who(initiator)),
            },
            Self::CallStarted { initiator } => format!("{} started a call", who(initiator)),
            Self::CallEnded { duration } => match duration {
                Some(d) => format!("Call ended after {}", format_iso_duration(d)),
                None => "Call ended".to_string(),
            },
            Self::MessagePinned { initiator } => format!("{} pinned a message", who(initiator)),
            Self::MessageUnpinned { initiator } => {
                format!("{} unpinned a message", who(initiator))
            }
            Self::Other {
                event_type,
                initiator,
            } => match initiator {
                Some(name) => format!("{name}: {event_type}"),
                None => event_type.clone(),
            },
        }
    }
}

fn join_or(names: &[String], fallback: &str) -> String {
    if names.is_empty() {
        fallback.to_string()
    } else {
        names.join(", ")
    }
}

/// Renders `PT1H2M3.5S` style durations as `1h 2m 3s`.
fn format_iso_duration(value: &str) -> String {
    let Some(rest) = value.strip_prefix("PT") else {
        return value.to_string();
    };

    let mut parts = Vec::new();
    let mut number = String::new();
    for c in rest.chars() {
        match c {
            'H' | 'M' | 'S' => {
                let whole = number.split('.').next().unwrap_or_default();
                if !whole.is_empty() && whole != "0" {
                    parts.push(format!("{whole}{}", c.to_ascii_lowercase()));
                }
                number.clear();
            }
            _ => number.push(c),
        }
    }

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Kind of message, decided once when the message is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Authored by a member.
    Content,
    /// Structural change to the conversation.
    SystemEvent(EventDetail),
    /// Message type the exporter does not render.
    Unhandled(String),
}

/// A single chat message.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    pub kind: MessageKind,
    /// Absent for system events.
    pub sender: Option<Participant>,
    /// HTML markup as returned by the service.
    pub body: String,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub importance: Importance,
    pub attachments: Vec<Attachment>,
}

/// Totals for a finished export run.
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Documents written, in processing order.
    pub written: Vec<PathBuf>,
    /// Conversations skipped by a filter gate.
    pub skipped: usize,
    /// Conversations abandoned because a fetch failed.
    pub failed: usize,
    /// Messages dropped because their kind is not rendered.
    pub unhandled_messages: usize,
}
