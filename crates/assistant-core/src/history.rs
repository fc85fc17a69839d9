//! Conversation history passed by value per turn.
//!
//! The pipeline keeps no cross-turn state: the surrounding application owns
//! persistence and hands the window in with every request. This module is
//! the value-type view of that window, with turn-based trimming for the
//! callers that only want recent context.

use crate::chat::{ChatMessage, Role};

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl HistoryMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An owned window of conversation history.
///
/// # Example
///
/// ```rust
/// use assistant_core::{ConversationWindow, HistoryMessage};
///
/// let window = ConversationWindow::from_messages(vec![
///     HistoryMessage::user("what's a good first mod?"),
///     HistoryMessage::assistant("An intake is a popular starting point."),
/// ]);
///
/// assert_eq!(window.len(), 2);
/// assert!(window.last_assistant().unwrap().contains("intake"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConversationWindow {
    messages: Vec<HistoryMessage>,
}

impl ConversationWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a window from an existing message list.
    pub fn from_messages(messages: Vec<HistoryMessage>) -> Self {
        Self { messages }
    }

    /// Append a message to the window.
    pub fn push(&mut self, message: HistoryMessage) {
        self.messages.push(message);
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[HistoryMessage] {
        &self.messages
    }

    /// Number of messages in the window.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The content of the most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// The last `n` turns as a trimmed window.
    ///
    /// A turn is a user message plus the assistant reply; trimming keeps at
    /// most `2 * n` trailing messages.
    pub fn last_turns(&self, n: usize) -> ConversationWindow {
        let max_messages = n.saturating_mul(2);
        let start = self.messages.len().saturating_sub(max_messages);
        Self {
            messages: self.messages[start..].to_vec(),
        }
    }

    /// Render the window as chat messages for an inference request.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| match m.role {
                Role::User => ChatMessage::user(m.content.clone()),
                Role::Assistant => ChatMessage::assistant(m.content.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_with_turns(turns: usize) -> ConversationWindow {
        let mut window = ConversationWindow::new();
        for i in 0..turns {
            window.push(HistoryMessage::user(format!("question {}", i)));
            window.push(HistoryMessage::assistant(format!("answer {}", i)));
        }
        window
    }

    #[test]
    fn test_last_assistant() {
        let window = window_with_turns(3);
        assert_eq!(window.last_assistant(), Some("answer 2"));

        let empty = ConversationWindow::new();
        assert!(empty.last_assistant().is_none());
    }

    #[test]
    fn test_last_assistant_skips_trailing_user() {
        let mut window = window_with_turns(1);
        window.push(HistoryMessage::user("follow-up"));
        assert_eq!(window.last_assistant(), Some("answer 0"));
    }

    #[test]
    fn test_last_turns_trims_oldest() {
        let window = window_with_turns(5);
        let trimmed = window.last_turns(2);

        assert_eq!(trimmed.len(), 4);
        assert_eq!(trimmed.messages()[0].content, "question 3");
    }

    #[test]
    fn test_last_turns_smaller_than_limit() {
        let window = window_with_turns(1);
        let trimmed = window.last_turns(10);
        assert_eq!(trimmed.len(), 2);
    }

    #[test]
    fn test_to_chat_messages_preserves_order_and_roles() {
        let window = window_with_turns(2);
        let messages = window.to_chat_messages();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[3].content[0].as_text(), Some("answer 1"));
    }
}
