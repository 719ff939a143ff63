//! Thread messages and transcripts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable key of a configured backend (e.g. "openai", "gemini").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BackendId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for BackendId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A single message in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// Something a human wrote.
    User { text: String },
    /// A reply previously produced by a backend.
    BackendReply { author: BackendId, text: String },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User { text: text.into() }
    }

    pub fn backend_reply(author: impl Into<BackendId>, text: impl Into<String>) -> Self {
        Message::BackendReply {
            author: author.into(),
            text: text.into(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Message::User { text } | Message::BackendReply { text, .. } => text,
        }
    }

    /// The originating backend, `None` for user messages.
    pub fn author(&self) -> Option<&BackendId> {
        match self {
            Message::User { .. } => None,
            Message::BackendReply { author, .. } => Some(author),
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::User { .. })
    }
}

/// Ordered conversation history, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(Message::is_user)
    }

    /// The opening question of the thread.
    pub fn first_user_question(&self) -> Option<&str> {
        self.messages.iter().find(|m| m.is_user()).map(Message::text)
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl FromIterator<Message> for Transcript {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_user_question_skips_replies() {
        let transcript = Transcript::from(vec![
            Message::backend_reply("openai", "Hello, I am here."),
            Message::user("What is AI?"),
            Message::user("And ML?"),
        ]);
        assert_eq!(transcript.first_user_question(), Some("What is AI?"));
        assert!(transcript.has_user_message());
    }

    #[test]
    fn test_empty_transcript_has_no_question() {
        let transcript = Transcript::new();
        assert_eq!(transcript.first_user_question(), None);
        assert!(!transcript.has_user_message());
    }

    #[test]
    fn test_message_serialization_shape() {
        let json = serde_json::to_value(Message::backend_reply("grok", "hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "backend_reply", "author": "grok", "text": "hi"})
        );

        let parsed: Transcript =
            serde_json::from_str(r#"[{"role": "user", "text": "Explain X"}]"#).unwrap();
        assert_eq!(parsed, Transcript::from(vec![Message::user("Explain X")]));
    }
}
