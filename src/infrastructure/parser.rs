//! JSON shapes returned by Microsoft Graph.
//!
//! Handles conversion from raw API resources to domain models.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{
    Attachment, Conversation, ConversationKind, EventDetail, Importance, Message, MessageKind,
    Participant,
};

/// One page of a collection.
#[derive(Debug, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub value: Vec<serde_json::Value>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// The signed-in user (`/me`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChat {
    pub id: String,
    #[serde(default)]
    chat_type: Option<String>,
    #[serde(default)]
    topic: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMember {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawIdentity {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawIdentitySet {
    #[serde(default)]
    user: Option<RawIdentity>,
    #[serde(default)]
    application: Option<RawIdentity>,
}

#[derive(Debug, Deserialize, Default)]
struct RawBody {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttachment {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    content_url: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventDetail {
    #[serde(rename = "@odata.type", default)]
    odata_type: String,
    #[serde(default)]
    initiator: Option<RawIdentitySet>,
    #[serde(default)]
    members: Option<Vec<RawIdentity>>,
    #[serde(default)]
    chat_display_name: Option<String>,
    #[serde(default)]
    call_duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub id: String,
    #[serde(default)]
    chat_id: Option<String>,
    created_date_time: DateTime<Utc>,
    #[serde(default)]
    last_edited_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    deleted_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    importance: Option<String>,
    #[serde(default)]
    from: Option<RawIdentitySet>,
    #[serde(default)]
    body: Option<RawBody>,
    #[serde(default)]
    attachments: Option<Vec<RawAttachment>>,
    #[serde(default)]
    event_detail: Option<RawEventDetail>,
}

impl From<RawChat> for Conversation {
    fn from(raw: RawChat) -> Self {
        Self {
            id: raw.id,
            kind: ConversationKind::from_remote(raw.chat_type.as_deref().unwrap_or_default()),
            topic: raw.topic.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl From<RawMember> for Participant {
    fn from(raw: RawMember) -> Self {
        Self::new(raw.user_id, raw.display_name.unwrap_or_default())
    }
}

impl From<RawUser> for Participant {
    fn from(raw: RawUser) -> Self {
        Self::new(Some(raw.id), raw.display_name.unwrap_or_default())
    }
}

impl RawIdentitySet {
    /// The user who acted, or the bot/application when no user is set.
    fn into_participant(self) -> Option<Participant> {
        let identity = self.user.or(self.application)?;
        Some(Participant::new(
            identity.id,
            identity.display_name.unwrap_or_default(),
        ))
    }

    fn display_name(&self) -> Option<String> {
        self.user
            .as_ref()
            .or(self.application.as_ref())
            .and_then(|i| i.display_name.clone())
    }
}

impl RawEventDetail {
    fn into_event(self) -> EventDetail {
        let initiator = self.initiator.as_ref().and_then(RawIdentitySet::display_name);
        let members = self
            .members
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.display_name)
            .collect();
        let event_type = self
            .odata_type
            .trim_start_matches("#microsoft.graph.")
            .trim_end_matches("EventMessageDetail");

        match event_type {
            "membersAdded" => EventDetail::MembersAdded { initiator, members },
            "membersDeleted" => EventDetail::MembersRemoved { initiator, members },
            "chatRenamed" => EventDetail::ChatRenamed {
                initiator,
                name: self.chat_display_name,
            },
            "callStarted" => EventDetail::CallStarted { initiator },
            "callEnded" => EventDetail::CallEnded {
                duration: self.call_duration,
            },
            "messagePinned" => EventDetail::MessagePinned { initiator },
            "messageUnpinned" => EventDetail::MessageUnpinned { initiator },
            other => EventDetail::Other {
                event_type: other.to_string(),
                initiator,
            },
        }
    }
}

/// Converts a raw message into the domain model.
///
/// `conversation_id` is used when the resource omits `chatId`.
pub fn parse_message(raw: RawMessage, conversation_id: &str) -> Message {
    let kind = match raw.message_type.as_deref().unwrap_or_default() {
        "message" => MessageKind::Content,
        "systemEventMessage" => MessageKind::SystemEvent(raw.event_detail.map_or_else(
            || EventDetail::Other {
                event_type: "system event".to_string(),
                initiator: None,
            },
            RawEventDetail::into_event,
        )),
        other => MessageKind::Unhandled(other.to_string()),
    };

    let attachments = raw
        .attachments
        .unwrap_or_default()
        .into_iter()
        .map(|a| Attachment {
            id: a.id.unwrap_or_default(),
            content_type: a.content_type.unwrap_or_default(),
            content_url: a.content_url,
            name: a.name,
        })
        .collect();

    Message {
        id: raw.id,
        conversation_id: raw.chat_id.unwrap_or_else(|| conversation_id.to_string()),
        created_at: raw.created_date_time,
        kind,
        sender: raw.from.and_then(RawIdentitySet::into_participant),
        body: raw.body.and_then(|b| b.content).unwrap_or_default(),
        edited_at: raw.last_edited_date_time,
        deleted_at: raw.deleted_date_time,
        importance: Importance::from_remote(raw.importance.as_deref()),
        attachments,
    }
}
