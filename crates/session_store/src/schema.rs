use serde::{Deserialize, Serialize};
use uuid::Uuid;

use live_preview::Document;

/// Fixed id of the seeded welcome message in every fresh session.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

/// Body of the seeded welcome message.
pub const WELCOME_MESSAGE_TEXT: &str = "Welcome! Ask for HTML, CSS, or JavaScript and watch the \
live preview update while the reply streams in.";

/// Prefix carried by auto-generated session titles until a rename happens.
pub const DEFAULT_TITLE_PREFIX: &str = "New Chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// One part of a message: plain text, or an opaque media reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum MessagePart {
    Text {
        content: String,
    },
    Image {
        content: String,
        mime_type: String,
        file_name: String,
    },
    File {
        content: String,
        mime_type: String,
        file_name: String,
    },
}

impl MessagePart {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    pub id: String,
    pub parts: Vec<MessagePart>,
    pub sender: Sender,
    pub timestamp: String,
}

impl Message {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        sender: Sender,
        parts: Vec<MessagePart>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parts,
            sender,
            timestamp: timestamp.into(),
        }
    }

    /// Builds a user message with a fresh id.
    #[must_use]
    pub fn user(parts: Vec<MessagePart>, timestamp: impl Into<String>) -> Self {
        Self::new(mint_id(), Sender::User, parts, timestamp)
    }

    /// Builds an assistant message with a fresh id.
    #[must_use]
    pub fn assistant(parts: Vec<MessagePart>, timestamp: impl Into<String>) -> Self {
        Self::new(mint_id(), Sender::Assistant, parts, timestamp)
    }

    /// Builds the empty assistant placeholder that a streaming reply mutates
    /// in place until it finishes.
    #[must_use]
    pub fn streaming_placeholder(timestamp: impl Into<String>) -> Self {
        Self::new(
            mint_id(),
            Sender::Assistant,
            vec![MessagePart::text("")],
            timestamp,
        )
    }

    /// Builds the seeded welcome message.
    #[must_use]
    pub fn welcome(timestamp: impl Into<String>) -> Self {
        Self::new(
            WELCOME_MESSAGE_ID,
            Sender::Assistant,
            vec![MessagePart::text(WELCOME_MESSAGE_TEXT)],
            timestamp,
        )
    }

    /// Concatenates the text parts of this message, skipping media parts.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for part in &self.parts {
            if let MessagePart::Text { content } = part {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(content);
            }
        }
        text
    }
}

/// One persisted conversation with its own transcript and live-preview state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: String,
    pub last_updated: String,
    pub preview: Document,
    pub editor: Document,
}

impl ChatSession {
    /// Builds a fresh session: seeded welcome message, fallback document in
    /// both artifact slots, matching created/updated timestamps.
    #[must_use]
    pub fn seeded(timestamp: impl Into<String>) -> Self {
        let timestamp = timestamp.into();
        Self {
            id: mint_id(),
            title: default_title(&timestamp),
            messages: vec![Message::welcome(timestamp.clone())],
            created_at: timestamp.clone(),
            last_updated: timestamp,
            preview: Document::fallback(),
            editor: Document::fallback(),
        }
    }

    /// Returns true while the title still carries the auto-generated prefix.
    #[must_use]
    pub fn has_default_title(&self) -> bool {
        self.title.starts_with(DEFAULT_TITLE_PREFIX)
    }
}

fn default_title(created_at: &str) -> String {
    // "2026-08-07T12:34" is enough to tell sessions apart in a picker.
    let stamp = created_at.get(..16).unwrap_or(created_at);
    format!("{DEFAULT_TITLE_PREFIX} {stamp}")
}

pub(crate) fn mint_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        ChatSession, Message, MessagePart, Sender, DEFAULT_TITLE_PREFIX, WELCOME_MESSAGE_ID,
        WELCOME_MESSAGE_TEXT,
    };

    const TS: &str = "2026-08-07T10:00:00.000Z";

    #[test]
    fn seeded_session_contains_exactly_the_welcome_message() {
        let session = ChatSession::seeded(TS);

        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].id, WELCOME_MESSAGE_ID);
        assert_eq!(session.messages[0].sender, Sender::Assistant);
        assert_eq!(session.messages[0].text_content(), WELCOME_MESSAGE_TEXT);
        assert!(session.has_default_title());
        assert_eq!(session.created_at, session.last_updated);
        assert_eq!(session.preview, session.editor);
    }

    #[test]
    fn seeded_sessions_get_unique_ids() {
        assert_ne!(ChatSession::seeded(TS).id, ChatSession::seeded(TS).id);
    }

    #[test]
    fn default_title_embeds_the_creation_stamp() {
        let session = ChatSession::seeded(TS);
        assert_eq!(
            session.title,
            format!("{DEFAULT_TITLE_PREFIX} 2026-08-07T10:00")
        );
    }

    #[test]
    fn streaming_placeholder_is_an_empty_assistant_text() {
        let placeholder = Message::streaming_placeholder(TS);

        assert_eq!(placeholder.sender, Sender::Assistant);
        assert_eq!(placeholder.parts, vec![MessagePart::text("")]);
        assert_eq!(placeholder.text_content(), "");
    }

    #[test]
    fn text_content_skips_media_parts() {
        let message = Message::user(
            vec![
                MessagePart::text("look at this"),
                MessagePart::Image {
                    content: "blob:abc".to_string(),
                    mime_type: "image/png".to_string(),
                    file_name: "shot.png".to_string(),
                },
                MessagePart::text("please"),
            ],
            TS,
        );

        assert_eq!(message.text_content(), "look at this\nplease");
    }

    #[test]
    fn message_parts_round_trip_through_tagged_json() {
        let parts = vec![
            MessagePart::text("hello"),
            MessagePart::File {
                content: "blob:doc".to_string(),
                mime_type: "text/plain".to_string(),
                file_name: "notes.txt".to_string(),
            },
        ];

        let serialized = serde_json::to_string(&parts).expect("parts serialize");
        assert!(serialized.contains("\"kind\":\"text\""));
        assert!(serialized.contains("\"kind\":\"file\""));

        let restored: Vec<MessagePart> =
            serde_json::from_str(&serialized).expect("parts deserialize");
        assert_eq!(restored, parts);
    }

    #[test]
    fn session_round_trips_through_json() {
        let session = ChatSession::seeded(TS);
        let serialized = serde_json::to_string(&session).expect("session serializes");
        let restored: ChatSession =
            serde_json::from_str(&serialized).expect("session deserializes");

        assert_eq!(restored, session);
    }
}
