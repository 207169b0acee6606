pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No session token found. Set {env_var} or add session_token to ~/.config/chatgpt/config.toml")]
    NoCredential { env_var: String },

    #[error("Not authenticated: no access token held and auto-refresh is off")]
    NotAuthenticated,

    #[error("Session exchange request failed: {0}")]
    Request(#[source] BoxError),

    #[error("Session exchange rejected with status {status}")]
    Rejected { status: u16, body: String },

    #[error("Malformed session response: {0}")]
    MalformedSession(#[from] serde_json::Error),

    #[error("Invalid expiry timestamp '{value}': {source}")]
    InvalidExpiry {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl AuthError {
    /// HTTP status of a rejected exchange.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
