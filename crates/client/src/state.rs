use crate::error::DecodeError;
use crate::types::{ConversationRequest, Message, StreamEvent, ACTION_NEXT};
use crate::ClientError;

/// Where the next turn attaches to the conversation.
///
/// Idle until the first successful turn: no conversation id and a client-made
/// parent id. Anchored afterwards: both ids come from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    conversation_id: String,
    parent_message_id: String,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            conversation_id: String::new(),
            parent_message_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn anchored(
        conversation_id: impl Into<String>,
        parent_message_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            parent_message_id: parent_message_id.into(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn parent_message_id(&self) -> &str {
        &self.parent_message_id
    }

    pub fn is_anchored(&self) -> bool {
        !self.conversation_id.is_empty()
    }

    /// Single user message continuing from this state.
    pub fn next_request(&self, text: &str, model: &str) -> ConversationRequest {
        ConversationRequest {
            action: ACTION_NEXT.to_string(),
            messages: vec![Message::user_text(uuid::Uuid::new_v4().to_string(), text)],
            conversation_id: Some(self.conversation_id.clone()).filter(|id| !id.is_empty()),
            parent_message_id: self.parent_message_id.clone(),
            model: model.to_string(),
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Tentative outcome of an in-flight turn.
///
/// Every well-formed event moves the tentative state to its ids; the first
/// malformed event is kept and poisons the turn.
#[derive(Debug)]
pub struct TurnAccumulator {
    tentative: ConversationState,
    reply: String,
    events: usize,
    first_error: Option<DecodeError>,
}

impl TurnAccumulator {
    pub fn new(start: ConversationState) -> Self {
        Self {
            tentative: start,
            reply: String::new(),
            events: 0,
            first_error: None,
        }
    }

    pub fn absorb(&mut self, event: StreamEvent) {
        self.events += 1;
        match event {
            StreamEvent::Message(resp) => {
                if let Some(text) = resp.text() {
                    self.reply = text.to_string();
                }
                self.tentative =
                    ConversationState::anchored(resp.conversation_id, resp.message.id);
            }
            StreamEvent::Malformed(err) => {
                if self.first_error.is_none() {
                    self.first_error = Some(err);
                }
            }
        }
    }

    pub fn events(&self) -> usize {
        self.events
    }

    /// The state to commit and the reply text, or the first decode error.
    pub fn finish(self) -> Result<(ConversationState, String), ClientError> {
        match self.first_error {
            Some(err) => Err(err.into()),
            None => Ok((self.tentative, self.reply)),
        }
    }
}
