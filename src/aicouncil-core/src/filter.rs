//! Per-backend views of a thread.
//!
//! In compare mode each backend sees the user's messages and only its own
//! earlier replies, as if it alone had been answering the thread. In debate
//! mode every backend sees everything, in arrival order.

use crate::message::{BackendId, Message, Transcript};
use crate::mode::Mode;

/// Produces the transcript a given backend is allowed to see.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFilter;

impl ContextFilter {
    pub fn new() -> Self {
        Self
    }

    /// Filter `transcript` for `target` under `mode`.
    ///
    /// Never adds content: the result is always an order-preserving
    /// subsequence of the input, so filtering twice changes nothing.
    pub fn filter(&self, transcript: &Transcript, target: &BackendId, mode: Mode) -> Transcript {
        match mode {
            Mode::Compare => transcript
                .iter()
                .filter(|message| Self::visible_in_isolation(message, target))
                .cloned()
                .collect(),
            Mode::Debate => transcript.clone(),
        }
    }

    fn visible_in_isolation(message: &Message, target: &BackendId) -> bool {
        match message.author() {
            None => true,
            Some(author) => author == target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread() -> Transcript {
        Transcript::from(vec![
            Message::user("What is AI?"),
            Message::backend_reply("openai", "AI is artificial intelligence"),
            Message::backend_reply("gemini", "AI stands for..."),
            Message::user("Tell me more"),
            Message::backend_reply("grok", "Sure, AI is..."),
        ])
    }

    #[test]
    fn test_compare_keeps_users_and_own_replies() {
        let filtered = ContextFilter::new().filter(&thread(), &BackendId::new("openai"), Mode::Compare);

        assert_eq!(
            filtered,
            Transcript::from(vec![
                Message::user("What is AI?"),
                Message::backend_reply("openai", "AI is artificial intelligence"),
                Message::user("Tell me more"),
            ])
        );
    }

    #[test]
    fn test_compare_for_backend_that_never_replied() {
        let filtered = ContextFilter::new().filter(&thread(), &BackendId::new("doubao"), Mode::Compare);

        assert_eq!(
            filtered,
            Transcript::from(vec![Message::user("What is AI?"), Message::user("Tell me more")])
        );
    }

    #[test]
    fn test_compare_without_user_messages_fabricates_nothing() {
        let transcript = Transcript::from(vec![Message::backend_reply("gemini", "hello")]);
        let filtered = ContextFilter::new().filter(&transcript, &BackendId::new("openai"), Mode::Compare);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_compare_filter_is_idempotent() {
        let filter = ContextFilter::new();
        let target = BackendId::new("gemini");
        let once = filter.filter(&thread(), &target, Mode::Compare);
        let twice = filter.filter(&once, &target, Mode::Compare);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_debate_keeps_everything_in_order() {
        let filtered = ContextFilter::new().filter(&thread(), &BackendId::new("openai"), Mode::Debate);
        assert_eq!(filtered, thread());
    }

    #[test]
    fn test_empty_transcript() {
        let filtered =
            ContextFilter::new().filter(&Transcript::new(), &BackendId::new("openai"), Mode::Compare);
        assert!(filtered.is_empty());
    }
}
