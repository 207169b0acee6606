use chatgpt_auth::{needs_refresh, AccessToken, AuthError, SessionCredential};
use chrono::{DateTime, Utc};
use reqwest::header::COOKIE;
use tokio::sync::RwLock;

use crate::transport::{join_url, Connection, HttpRequest};
use crate::ClientError;

/// Owns the session credential and the access token derived from it.
///
/// Refreshes are not coalesced: two callers that both find the token stale will
/// both hit the session endpoint, and the last response wins.
pub struct TokenManager {
    credential: SessionCredential,
    api_base: String,
    token: RwLock<Option<AccessToken>>,
}

impl TokenManager {
    pub fn new(credential: SessionCredential, api_base: impl Into<String>) -> Self {
        Self {
            credential,
            api_base: api_base.into(),
            token: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Option<AccessToken> {
        self.token.read().await.clone()
    }

    pub async fn ensure_valid(
        &self,
        conn: &Connection,
        now: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let stale = needs_refresh(self.token.read().await.as_ref(), now);
        if stale {
            tracing::info!("Access token missing or expired, refreshing");
            self.refresh(conn).await?;
        }
        Ok(())
    }

    pub async fn refresh(&self, conn: &Connection) -> Result<AccessToken, ClientError> {
        let request = HttpRequest::get(join_url(&self.api_base, "auth/session"))
            .header(COOKIE, &self.credential.cookie_header())
            .map_err(ClientError::into_auth)?;

        let mut response = conn.send(request).await.map_err(ClientError::into_auth)?;

        if response.status != reqwest::StatusCode::OK {
            let status = response.status.as_u16();
            let body = response.text().await;
            return Err(AuthError::Rejected { status, body }.into());
        }

        let body = response
            .collect_body()
            .await
            .map_err(|e| ClientError::from(AuthError::Request(e)))?;
        let token = AccessToken::from_session_body(&body)?;

        tracing::debug!(expires_at = %token.expires_at(), "Access token refreshed");
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Value for the `Authorization` header. Does not refresh.
    pub async fn bearer(&self) -> Result<String, ClientError> {
        match self.token.read().await.as_ref() {
            Some(token) if !token.value().is_empty() => Ok(token.value().to_string()),
            _ => Err(AuthError::NotAuthenticated.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::testing::{session_body, ScriptedResponse, ScriptedTransport};

    fn setup(
        responses: Vec<ScriptedResponse>,
    ) -> (Arc<ScriptedTransport>, Connection, TokenManager) {
        let transport = Arc::new(ScriptedTransport::new(responses));
        let conn = Connection::new(transport.clone(), "agent", None);
        let tokens = TokenManager::new(SessionCredential::new("sess"), "http://x/api");
        (transport, conn, tokens)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 12, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn refresh_sends_cookie_and_stores_token() {
        let (transport, conn, tokens) = setup(vec![ScriptedResponse::ok(&session_body(
            "tok-1",
            "2023-01-12T13:00:00Z",
        ))]);

        let token = tokens.refresh(&conn).await.unwrap();
        assert_eq!(token.value(), "tok-1");
        assert_eq!(tokens.current().await, Some(token));
        assert_eq!(tokens.bearer().await.unwrap(), "tok-1");

        let sent = transport.requests();
        assert_eq!(sent[0].url, "http://x/api/auth/session");
        assert_eq!(sent[0].method, reqwest::Method::GET);
        assert_eq!(
            sent[0].headers[COOKIE],
            "__Secure-next-auth.session-token=sess"
        );
    }

    #[tokio::test]
    async fn ensure_valid_is_a_noop_for_a_fresh_token() {
        let (transport, conn, tokens) = setup(vec![ScriptedResponse::ok(&session_body(
            "tok-1",
            "2023-01-12T13:00:00Z",
        ))]);

        tokens.ensure_valid(&conn, noon()).await.unwrap();
        tokens.ensure_valid(&conn, noon()).await.unwrap();
        tokens
            .ensure_valid(&conn, noon() + Duration::minutes(59))
            .await
            .unwrap();
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn ensure_valid_refreshes_at_expiry() {
        let (transport, conn, tokens) = setup(vec![
            ScriptedResponse::ok(&session_body("tok-1", "2023-01-12T13:00:00Z")),
            ScriptedResponse::ok(&session_body("tok-2", "2023-01-12T14:00:00Z")),
        ]);

        tokens.ensure_valid(&conn, noon()).await.unwrap();
        tokens
            .ensure_valid(&conn, noon() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(tokens.bearer().await.unwrap(), "tok-2");
    }

    #[tokio::test]
    async fn empty_access_token_is_refreshed_again() {
        let (transport, conn, tokens) = setup(vec![
            ScriptedResponse::ok(&session_body("", "2099-01-01T00:00:00Z")),
            ScriptedResponse::ok(&session_body("tok", "2099-01-01T00:00:00Z")),
        ]);

        tokens.ensure_valid(&conn, noon()).await.unwrap();
        assert!(tokens.bearer().await.is_err());
        tokens.ensure_valid(&conn, noon()).await.unwrap();
        assert_eq!(tokens.bearer().await.unwrap(), "tok");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn rejected_exchange_keeps_no_token() {
        let (_, conn, tokens) = setup(vec![ScriptedResponse::status(
            401,
            r#"{"detail":"bad session"}"#,
        )]);

        let err = tokens.refresh(&conn).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        match err {
            ClientError::Auth(AuthError::Rejected { body, .. }) => {
                assert!(body.contains("bad session"))
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert!(tokens.current().await.is_none());
        assert!(matches!(
            tokens.bearer().await,
            Err(ClientError::Auth(AuthError::NotAuthenticated))
        ));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_token() {
        let (_, conn, tokens) = setup(vec![
            ScriptedResponse::ok(&session_body("tok-1", "2023-01-12T13:00:00Z")),
            ScriptedResponse::ok(r#"{"expires":"tomorrow","accessToken":"tok-2"}"#),
        ]);

        tokens.refresh(&conn).await.unwrap();
        let err = tokens.refresh(&conn).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Auth(AuthError::InvalidExpiry { .. })
        ));
        assert_eq!(tokens.bearer().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn network_failure_is_an_auth_error() {
        let (_, conn, tokens) = setup(vec![ScriptedResponse::fail("dns")]);
        let err = tokens.refresh(&conn).await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(AuthError::Request(_))));
    }

    #[tokio::test]
    async fn malformed_session_body_is_an_auth_error() {
        let (_, conn, tokens) = setup(vec![ScriptedResponse::ok("<html>")]);
        let err = tokens.refresh(&conn).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Auth(AuthError::MalformedSession(_))
        ));
    }
}
