//! Display names for conversations.

use crate::domain::{Conversation, ConversationKind, Participant};

/// Joins member names of untitled group chats.
pub const NAME_SEPARATOR: &str = ", ";

/// Derives the presentational name of a conversation.
///
/// Topic first; otherwise the other member of a one-to-one chat; otherwise
/// every member except the signed-in user. The result may be empty and is
/// not unique.
pub fn resolve_name(
    conversation: &Conversation,
    members: &[Participant],
    current_user: &Participant,
) -> String {
    if let Some(topic) = conversation.topic.as_deref().map(str::trim) {
        if !topic.is_empty() {
            return topic.to_string();
        }
    }

    let mut others = members
        .iter()
        .filter(|m| !m.is_same_person(current_user))
        .map(|m| m.display_name.trim())
        .filter(|name| !name.is_empty());

    match conversation.kind {
        ConversationKind::OneToOne => others.next().unwrap_or_default().to_string(),
        ConversationKind::Group | ConversationKind::Other(_) => {
            others.collect::<Vec<_>>().join(NAME_SEPARATOR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn me() -> Participant {
        Participant::new(Some("me".into()), "Pat Smith")
    }

    fn conversation(kind: ConversationKind, topic: Option<&str>) -> Conversation {
        Conversation {
            id: "19:x".into(),
            kind,
            topic: topic.map(str::to_string),
        }
    }

    fn members() -> Vec<Participant> {
        vec![
            me(),
            Participant::new(Some("u1".into()), "Alex Doe"),
            Participant::new(Some("u2".into()), "Sam Roe"),
        ]
    }

    #[test]
    fn test_topic_wins() {
        let conv = conversation(ConversationKind::Group, Some("Launch plan"));
        assert_eq!(resolve_name(&conv, &members(), &me()), "Launch plan");
    }

    #[test]
    fn test_one_to_one_uses_other_member() {
        let conv = conversation(ConversationKind::OneToOne, None);
        let members = vec![me(), Participant::new(Some("u1".into()), "Alex Doe")];
        assert_eq!(resolve_name(&conv, &members, &me()), "Alex Doe");
    }

    #[test]
    fn test_group_joins_other_members() {
        let conv = conversation(ConversationKind::Group, Some("   "));
        assert_eq!(resolve_name(&conv, &members(), &me()), "Alex Doe, Sam Roe");
    }

    #[test]
    fn test_meeting_without_topic_joins_like_group() {
        let conv = conversation(ConversationKind::Other("meeting".into()), None);
        assert_eq!(resolve_name(&conv, &members(), &me()), "Alex Doe, Sam Roe");
    }

    #[test]
    fn test_no_other_members_is_empty() {
        let conv = conversation(ConversationKind::OneToOne, None);
        assert_eq!(resolve_name(&conv, &[me()], &me()), "");
        assert_eq!(resolve_name(&conv, &[], &me()), "");
    }

    #[test]
    fn test_blank_member_names_are_ignored() {
        let conv = conversation(ConversationKind::Group, None);
        let members = vec![
            me(),
            Participant::new(Some("u3".into()), " "),
            Participant::new(Some("u1".into()), "Alex Doe"),
        ];
        assert_eq!(resolve_name(&conv, &members, &me()), "Alex Doe");
    }
}
