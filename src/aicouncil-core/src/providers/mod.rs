//! Concrete [`Backend`](crate::backend::Backend) implementations.

mod gemini;
mod openai;

pub use gemini::GeminiBackend;
pub use openai::OpenAiCompatibleBackend;

use crate::message::{BackendId, Message, Transcript};

/// A transcript entry as seen from one backend's chair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Turn {
    User(String),
    Assistant(String),
}

/// Map a filtered transcript onto user/assistant turns for `own`.
///
/// Rival replies (only present in debate) are relayed as user turns
/// naming their author, so the backend never mistakes them for its own.
pub(crate) fn turns_for(own: &BackendId, transcript: &Transcript) -> Vec<Turn> {
    transcript
        .iter()
        .map(|message| match message {
            Message::User { text } => Turn::User(text.clone()),
            Message::BackendReply { author, text } if author == own => {
                Turn::Assistant(text.clone())
            }
            Message::BackendReply { author, text } => {
                Turn::User(format!("[{} said]: {}", author, text))
            }
        })
        .collect()
}
