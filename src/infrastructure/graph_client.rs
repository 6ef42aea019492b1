//! Microsoft Graph client for chats, members and messages.
//!
//! Collections are paged: every response may carry an `@odata.nextLink`
//! which `Pages` follows until the service stops returning one.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use url::Url;

use crate::domain::{AppError, Conversation, Message, Participant, Result};

use super::parser::{parse_message, RawChat, RawMember, RawMessage, RawPage, RawUser};
use super::transport::Transport;

/// Path segment shared by every inline image URL.
const HOSTED_CONTENTS: &str = "/hostedContents/";

/// Cursor over one paged collection.
///
/// Finite and not restartable; ask the client for a new one to start over.
pub struct Pages<'a, T, R> {
    transport: &'a T,
    next: Option<String>,
    conversation_id: Option<String>,
    _item: PhantomData<R>,
}

impl<'a, T: Transport, R: DeserializeOwned> Pages<'a, T, R> {
    fn new(transport: &'a T, url: String, conversation_id: Option<&str>) -> Self {
        Self {
            transport,
            next: Some(url),
            conversation_id: conversation_id.map(str::to_string),
            _item: PhantomData,
        }
    }

    /// Fetches the next page, or `None` once the collection is exhausted.
    ///
    /// Items that fail to deserialize are dropped with a warning.
    ///
    /// # Errors
    /// Returns `RemoteFetch` tagged with the conversation id on a non-success status.
    pub async fn next_page(&mut self) -> Result<Option<Vec<R>>> {
        let Some(url) = self.next.take() else {
            return Ok(None);
        };

        let value = match self.transport.get_json(&url).await {
            Ok(value) => value,
            Err(e) => {
                return Err(match &self.conversation_id {
                    Some(id) => e.for_conversation(id),
                    None => e,
                })
            }
        };
        let page: RawPage = serde_json::from_value(value).map_err(AppError::json_parse)?;

        self.next = page.next_link.filter(|next| {
            if *next == url {
                tracing::warn!("Continuation link points back at {}, stopping", url);
                false
            } else {
                true
            }
        });

        let items = page
            .value
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!("Dropping unparseable item from {}: {}", url, e);
                    None
                }
            })
            .collect();

        Ok(Some(items))
    }

    /// Drains every remaining page into one vector.
    ///
    /// # Errors
    /// Returns the first page error; items already fetched are discarded.
    pub async fn try_collect(mut self) -> Result<Vec<R>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }
}

/// Client for the chat endpoints of Microsoft Graph.
pub struct GraphClient<T> {
    transport: T,
    base: String,
    origin: String,
    page_size: u32,
}

impl<T: Transport> GraphClient<T> {
    /// Creates a client rooted at `base` (e.g. `https://graph.microsoft.com/v1.0`).
    ///
    /// # Errors
    /// Returns `Config` if `base` is not an absolute URL.
    pub fn new(transport: T, base: &str, page_size: u32) -> Result<Self> {
        let parsed = Url::parse(base).map_err(|e| AppError::Config {
            message: format!("Invalid API base URL {base}: {e}"),
        })?;

        Ok(Self {
            transport,
            base: base.trim_end_matches('/').to_string(),
            origin: parsed.origin().ascii_serialization(),
            page_size: page_size.clamp(1, 50),
        })
    }

    #[cfg(test)]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The signed-in user.
    ///
    /// # Errors
    /// Returns error if `/me` cannot be fetched or parsed.
    pub async fn current_user(&self) -> Result<Participant> {
        let value = self.transport.get_json(&format!("{}/me", self.base)).await?;
        let user: RawUser = serde_json::from_value(value).map_err(AppError::json_parse)?;
        Ok(user.into())
    }

    /// Cursor over the signed-in user's chats.
    pub fn conversations(&self) -> Pages<'_, T, RawChat> {
        let url = format!("{}/me/chats?$top={}", self.base, self.page_size);
        Pages::new(&self.transport, url, None)
    }

    /// All chats, in the order the service lists them.
    ///
    /// # Errors
    /// Returns error if any page fails.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let raw = self.conversations().try_collect().await?;
        tracing::info!("Listed {} conversations", raw.len());
        Ok(raw.into_iter().map(Conversation::from).collect())
    }

    /// Members of one chat.
    ///
    /// # Errors
    /// Returns `RemoteFetch` tagged with the conversation id.
    pub async fn list_members(&self, conversation: &Conversation) -> Result<Vec<Participant>> {
        let url = format!("{}/chats/{}/members", self.base, conversation.id);
        let raw: Vec<RawMember> = Pages::new(&self.transport, url, Some(conversation.id.as_str()))
            .try_collect()
            .await?;
        Ok(raw.into_iter().map(Participant::from).collect())
    }

    /// Cursor over one chat's messages, in service order.
    pub fn messages(&self, conversation: &Conversation) -> Pages<'_, T, RawMessage> {
        let url = format!(
            "{}/chats/{}/messages?$top={}",
            self.base, conversation.id, self.page_size
        );
        Pages::new(&self.transport, url, Some(conversation.id.as_str()))
    }

    /// Every message of one chat, in service order.
    ///
    /// # Errors
    /// Returns `RemoteFetch` tagged with the conversation id.
    pub async fn list_messages(&self, conversation: &Conversation) -> Result<Vec<Message>> {
        let raw = self.messages(conversation).try_collect().await?;
        Ok(raw
            .into_iter()
            .map(|m| parse_message(m, &conversation.id))
            .collect())
    }

    /// Raw bytes of a user's profile picture.
    ///
    /// # Errors
    /// Returns `RemoteFetch` (usually 404 when the user has no picture).
    pub async fn profile_photo(&self, user_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/users/{user_id}/photo/$value", self.base);
        self.transport.get_bytes(&url).await
    }

    /// Raw bytes of an inline image.
    ///
    /// # Errors
    /// Returns `RemoteFetch` on a non-success status.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.transport.get_bytes(url).await
    }

    /// True when `url` is an inline image served by this API.
    #[must_use]
    pub fn is_hosted_content(&self, url: &str) -> bool {
        url.starts_with(&self.origin) && url.contains(HOSTED_CONTENTS)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{ConversationKind, MessageKind};
    use crate::infrastructure::transport::fake::FakeTransport;

    const BASE: &str = "https://graph.test/v1.0";

    fn chat(id: &str) -> Conversation {
        Conversation {
            id: id.into(),
            kind: ConversationKind::Group,
            topic: None,
        }
    }

    fn message(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "createdDateTime": "2024-03-01T10:15:00Z",
            "messageType": "message",
            "body": {"content": id}
        })
    }

    #[tokio::test]
    async fn test_follows_continuation_links() {
        let first = format!("{BASE}/chats/c1/messages?$top=2");
        let second = format!("{BASE}/chats/c1/messages?$skiptoken=abc");
        let transport = FakeTransport::new()
            .json(
                &first,
                json!({"value": [message("m1"), message("m2")], "@odata.nextLink": second}),
            )
            .json(&second, json!({"value": [message("m3")]}));
        let client = GraphClient::new(transport, BASE, 2).unwrap();

        let messages = client.list_messages(&chat("c1")).await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
        assert_eq!(client.transport().total_calls(), 2);
    }

    #[tokio::test]
    async fn test_pages_are_lazy() {
        let first = format!("{BASE}/chats/c1/messages?$top=50");
        let second = format!("{BASE}/next");
        let transport = FakeTransport::new()
            .json(&first, json!({"value": [message("m1")], "@odata.nextLink": second}))
            .json(&second, json!({"value": [message("m2")]}));
        let client = GraphClient::new(transport, BASE, 50).unwrap();

        let conversation = chat("c1");
        let mut pages = client.messages(&conversation);
        let page = pages.next_page().await.unwrap().unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(client.transport().calls(&second), 0);

        assert!(pages.next_page().await.unwrap().is_some());
        assert!(pages.next_page().await.unwrap().is_none());
        assert_eq!(client.transport().total_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_carries_conversation_id() {
        let transport = FakeTransport::new().status(&format!("{BASE}/chats/c9/members"), 403);
        let client = GraphClient::new(transport, BASE, 50).unwrap();

        let err = client.list_members(&chat("c9")).await.unwrap_err();
        match err {
            AppError::RemoteFetch {
                status,
                conversation_id,
                ..
            } => {
                assert_eq!(status, 403);
                assert_eq!(conversation_id.as_deref(), Some("c9"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_self_referencing_link_stops() {
        let url = format!("{BASE}/me/chats?$top=50");
        let transport = FakeTransport::new().json(
            &url,
            json!({"value": [{"id": "c1", "chatType": "oneOnOne"}], "@odata.nextLink": url}),
        );
        let client = GraphClient::new(transport, BASE, 50).unwrap();

        let conversations = client.list_conversations().await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].kind, ConversationKind::OneToOne);
    }

    #[tokio::test]
    async fn test_current_user() {
        let transport = FakeTransport::new().json(
            &format!("{BASE}/me"),
            json!({"id": "u1", "displayName": "Alex Doe"}),
        );
        let client = GraphClient::new(transport, BASE, 50).unwrap();

        let me = client.current_user().await.unwrap();
        assert_eq!(me.user_id.as_deref(), Some("u1"));
        assert_eq!(me.display_name, "Alex Doe");
    }

    #[tokio::test]
    async fn test_unparseable_item_is_dropped() {
        let url = format!("{BASE}/chats/c1/messages?$top=50");
        let transport = FakeTransport::new().json(
            &url,
            json!({"value": [{"id": "broken"}, message("m2")]}),
        );
        let client = GraphClient::new(transport, BASE, 50).unwrap();

        let messages = client.list_messages(&chat("c1")).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Content);
    }

    #[tokio::test]
    async fn test_null_collections_keep_messages() {
        let url = format!("{BASE}/chats/c1/messages?$top=50");
        let transport = FakeTransport::new().json(
            &url,
            json!({"value": [
                {
                    "id": "m1",
                    "createdDateTime": "2024-03-01T10:15:00Z",
                    "messageType": "message",
                    "body": {"content": "hi"},
                    "attachments": null
                },
                {
                    "id": "m2",
                    "createdDateTime": "2024-03-01T10:16:00Z",
                    "messageType": "systemEventMessage",
                    "eventDetail": {
                        "@odata.type": "#microsoft.graph.membersDeletedEventMessageDetail",
                        "members": null
                    }
                }
            ]}),
        );
        let client = GraphClient::new(transport, BASE, 50).unwrap();

        let messages = client.list_messages(&chat("c1")).await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
    }

    #[test]
    fn test_is_hosted_content() {
        let client = GraphClient::new(FakeTransport::new(), BASE, 50).unwrap();
        assert!(client.is_hosted_content(
            "https://graph.test/v1.0/chats/c1/messages/m1/hostedContents/x/$value"
        ));
        assert!(!client.is_hosted_content("https://elsewhere/hostedContents/x"));
        assert!(!client.is_hosted_content("https://graph.test/v1.0/users/u1/photo"));
    }

    #[test]
    fn test_invalid_base_is_config_error() {
        let result = GraphClient::new(FakeTransport::new(), "not a url", 50);
        assert!(matches!(result, Err(AppError::Config { .. })));
    }
}
