use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::state::{ConversationState, TurnAccumulator};
use crate::types::StreamEvent;
use crate::{Client, ClientError};

/// One conversation thread on top of a [`Client`].
///
/// Turns run one at a time: the state lock is held from building the request
/// until the new anchor is committed, so a second caller waits for the first
/// turn to finish and then continues from its result.
pub struct Conversation {
    client: Arc<Client>,
    state: Mutex<ConversationState>,
}

impl Conversation {
    pub fn new(client: Arc<Client>) -> Self {
        Self::with_state(client, ConversationState::new())
    }

    pub fn with_state(client: Arc<Client>, state: ConversationState) -> Self {
        Self {
            client,
            state: Mutex::new(state),
        }
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    pub async fn state(&self) -> ConversationState {
        self.state.lock().await.clone()
    }

    /// Sends `text` as the next user message and streams the reply into
    /// `handler`. Returns the final reply text.
    ///
    /// The conversation only moves forward when the stream ends cleanly with no
    /// malformed payloads; any error or cancellation leaves the anchor where it
    /// was, so retrying the same text continues from the same place.
    pub async fn send_turn<F>(
        &self,
        cancel: &CancellationToken,
        text: &str,
        mut handler: F,
    ) -> Result<String, ClientError>
    where
        F: FnMut(&StreamEvent),
    {
        let mut state = self.state.lock().await;
        let request = state.next_request(text, self.client.model());
        let mut turn = TurnAccumulator::new(state.clone());

        self.client
            .conversation(cancel, &request, |event| {
                handler(&event);
                turn.absorb(event);
            })
            .await?;

        let (next, reply) = turn.finish()?;
        tracing::debug!(
            conversation_id = next.conversation_id(),
            parent_message_id = next.parent_message_id(),
            "Turn committed"
        );
        *state = next;
        Ok(reply)
    }

    /// [`send_turn`](Self::send_turn) without a per-event handler.
    pub async fn next(
        &self,
        cancel: &CancellationToken,
        text: &str,
    ) -> Result<String, ClientError> {
        self.send_turn(cancel, text, |_| {}).await
    }
}
