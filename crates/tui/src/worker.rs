use std::sync::Arc;

use chatgpt_client::{ClientError, Conversation};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct TurnRequest {
    pub text: String,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub enum TurnUpdate {
    /// Reply text so far. Each event carries the whole reply, not a delta.
    Partial(String),
    Finished(Result<String, ClientError>),
}

/// Background task that runs turns one after another.
pub struct Worker {
    requests: mpsc::UnboundedSender<TurnRequest>,
    updates: mpsc::UnboundedReceiver<TurnUpdate>,
    handle: JoinHandle<()>,
}

impl Worker {
    pub fn spawn(conversation: Arc<Conversation>) -> Self {
        let (requests, mut incoming) = mpsc::unbounded_channel::<TurnRequest>();
        let (outgoing, updates) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Some(request) = incoming.recv().await {
                let result = conversation
                    .send_turn(&request.cancel, &request.text, |event| {
                        if let Some(text) = event.message().and_then(|m| m.text()) {
                            let _ = outgoing.send(TurnUpdate::Partial(text.to_string()));
                        }
                    })
                    .await;
                tracing::debug!(ok = result.is_ok(), "Turn finished");
                if outgoing.send(TurnUpdate::Finished(result)).is_err() {
                    break;
                }
            }
        });

        Self {
            requests,
            updates,
            handle,
        }
    }

    pub fn submit(&self, request: TurnRequest) -> bool {
        self.requests.send(request).is_ok()
    }

    pub fn try_update(&mut self) -> Option<TurnUpdate> {
        self.updates.try_recv().ok()
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}
