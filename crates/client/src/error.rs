use chatgpt_auth::{AuthError, BoxError};

fn extract_error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = v["detail"].as_str() {
            return msg.to_string();
        }
        if let Some(msg) = v["detail"]["message"].as_str() {
            return msg.to_string();
        }
        if let Some(msg) = v["error"]["message"].as_str() {
            return msg.to_string();
        }
        if let Some(msg) = v["error"].as_str() {
            return msg.to_string();
        }
        if let Some(msg) = v["message"].as_str() {
            return msg.to_string();
        }
    }
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

fn status_suffix(body: &str) -> String {
    let msg = extract_error_message(body);
    if msg.is_empty() {
        String::new()
    } else {
        format!(": {msg}")
    }
}

/// A `data: ` payload that did not parse as a conversation event.
#[derive(Debug, thiserror::Error)]
#[error("Malformed stream payload: {source}")]
pub struct DecodeError {
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("Unexpected status {status}{}", status_suffix(body))]
    Remote { status: u16, body: String },

    #[error("Stream read error: {0}")]
    StreamRead(#[source] BoxError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Cancelled")]
    Cancelled,
}

impl ClientError {
    /// HTTP status carried by a remote or auth-exchange rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::Auth(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Transport-level failures during the session exchange are reported as auth failures.
    pub(crate) fn into_auth(self) -> Self {
        match self {
            Self::Transport(err) | Self::StreamRead(err) => Self::Auth(AuthError::Request(err)),
            other => other,
        }
    }
}
