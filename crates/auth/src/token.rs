use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::AuthError;

/// Body of a successful `/auth/session` exchange.
#[derive(Debug, Deserialize)]
pub struct AuthSessionResponse {
    #[serde(default)]
    pub expires: String,
    #[serde(rename = "accessToken", default)]
    pub access_token: String,
}

/// Short-lived bearer token derived from the session credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Parses an `/auth/session` body. The expiry must be RFC 3339.
    pub fn from_session_body(body: &[u8]) -> Result<Self, AuthError> {
        let session: AuthSessionResponse = serde_json::from_slice(body)?;
        let expires_at = DateTime::parse_from_rfc3339(&session.expires)
            .map_err(|source| AuthError::InvalidExpiry {
                value: session.expires.clone(),
                source,
            })?
            .with_timezone(&Utc);
        Ok(Self::new(session.access_token, expires_at))
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// An empty token is never valid, whatever its expiry says.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && now < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub fn needs_refresh(token: Option<&AccessToken>, now: DateTime<Utc>) -> bool {
    match token {
        Some(token) => !token.is_valid_at(now),
        None => true,
    }
}
