//! Chat transcript with pending replies.
//!
//! Every submitted message gets a [`Ticket`]. A placeholder bubble carrying
//! that ticket is shown until the reply arrives; the reply replaces it. A
//! reply whose ticket no longer matches a bubble in the current conversation
//! is dropped.

mod transport;

pub use transport::{HttpTransport, Transport, WsTransport};

use crate::error::Error;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Text of a bubble waiting for its reply
pub const PENDING_TEXT: &str = "…";

/// Bot text shown when the transport fails
pub const APOLOGY_TEXT: &str = "Sorry, I could not reach the server. Please try again.";

/// Outbound payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Expected reply payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// Identifies one request and the conversation it was made in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub conversation: u64,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    /// Set while the bubble waits for its reply
    pub pending: Option<Ticket>,
}

impl ChatMessage {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            pending: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    conversation: u64,
    next_id: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Record the user's message and a pending bot bubble. Blank input is
    /// ignored.
    pub fn submit(&mut self, text: &str) -> Option<(Ticket, ChatRequest)> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }

        let ticket = Ticket {
            conversation: self.conversation,
            id: self.next_id,
        };
        self.next_id += 1;

        self.messages.push(ChatMessage::new(Sender::User, message));
        self.messages.push(ChatMessage {
            sender: Sender::Bot,
            text: PENDING_TEXT.to_string(),
            pending: Some(ticket),
        });

        Some((
            ticket,
            ChatRequest {
                message: message.to_string(),
            },
        ))
    }

    /// Apply a finished request. Returns false when the reply was stale and
    /// discarded.
    pub fn complete(&mut self, ticket: Ticket, result: Result<ChatReply, Error>) -> bool {
        if ticket.conversation != self.conversation {
            debug!(?ticket, "dropping reply from a previous conversation");
            return false;
        }
        let Some(bubble) = self.messages.iter_mut().find(|m| m.pending == Some(ticket)) else {
            debug!(?ticket, "no pending bubble for reply");
            return false;
        };

        bubble.pending = None;
        bubble.text = match result {
            Ok(reply) => reply.response,
            Err(e) => {
                warn!(error = %e, "chat request failed");
                APOLOGY_TEXT.to_string()
            }
        };
        true
    }

    /// Start over; replies still in flight will be discarded
    pub fn new_conversation(&mut self) {
        self.conversation += 1;
        self.messages.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.pending.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_submit_ignored() {
        let mut chat = ChatSession::new();
        assert!(chat.submit("   ").is_none());
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn test_submit_shows_pending() {
        let mut chat = ChatSession::new();
        let (ticket, request) = chat.submit("  hello ").unwrap();
        assert_eq!(request.message, "hello");
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[1].pending, Some(ticket));
        assert_eq!(chat.pending_count(), 1);
    }

    #[test]
    fn test_reply_replaces_pending() {
        let mut chat = ChatSession::new();
        let (ticket, _) = chat.submit("hello").unwrap();
        assert!(chat.complete(
            ticket,
            Ok(ChatReply {
                response: "hi there".into()
            })
        ));
        assert_eq!(chat.messages()[1].text, "hi there");
        assert_eq!(chat.pending_count(), 0);
    }

    #[test]
    fn test_transport_failure_one_bot_message() {
        let mut chat = ChatSession::new();
        let (ticket, _) = chat.submit("hello").unwrap();
        assert!(chat.complete(ticket, Err(Error::Transport("connection refused".into()))));

        let bots: Vec<_> = chat
            .messages()
            .iter()
            .filter(|m| m.sender == Sender::Bot)
            .collect();
        assert_eq!(bots.len(), 1);
        assert_eq!(bots[0].text, APOLOGY_TEXT);
        assert_eq!(chat.messages()[0].text, "hello");
    }

    #[test]
    fn test_out_of_order_replies() {
        let mut chat = ChatSession::new();
        let (first, _) = chat.submit("one").unwrap();
        let (second, _) = chat.submit("two").unwrap();
        chat.complete(second, Ok(ChatReply { response: "2".into() }));
        chat.complete(first, Ok(ChatReply { response: "1".into() }));
        let texts: Vec<_> = chat.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "1", "two", "2"]);
    }

    #[test]
    fn test_stale_reply_discarded() {
        let mut chat = ChatSession::new();
        let (ticket, _) = chat.submit("hello").unwrap();
        chat.new_conversation();
        assert!(!chat.complete(ticket, Ok(ChatReply { response: "late".into() })));
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn test_duplicate_completion_ignored() {
        let mut chat = ChatSession::new();
        let (ticket, _) = chat.submit("hello").unwrap();
        assert!(chat.complete(ticket, Ok(ChatReply { response: "a".into() })));
        assert!(!chat.complete(ticket, Ok(ChatReply { response: "b".into() })));
        assert_eq!(chat.messages()[1].text, "a");
    }

    #[test]
    fn test_payload_shapes() {
        let body = serde_json::to_string(&ChatRequest {
            message: "hello".into(),
        })
        .unwrap();
        assert_eq!(body, r#"{"message":"hello"}"#);
        let reply: ChatReply = serde_json::from_str(r#"{"response":"hi"}"#).unwrap();
        assert_eq!(reply.response, "hi");
    }
}
