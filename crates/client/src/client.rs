use std::sync::Arc;

use chatgpt_auth::{AccessToken, SessionCredential};
use chatgpt_config::{ClientConfig, DEFAULT_API_BASE, DEFAULT_BACKEND_BASE, DEFAULT_MODEL};
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{DiagnosticSink, StderrSink};
use crate::sse;
use crate::token::TokenManager;
use crate::transport::{join_url, Connection, HttpRequest, ReqwestTransport, Transport};
use crate::types::{ConversationRequest, StreamEvent};
use crate::ClientError;

/// Construction-time settings. Immutable once the client is built.
#[derive(Clone)]
pub struct ClientOptions {
    pub transport: Option<Arc<dyn Transport>>,
    pub user_agent: String,
    pub diagnostics: Option<Arc<dyn DiagnosticSink>>,
    pub auto_refresh: bool,
    pub api_base: String,
    pub backend_base: String,
    pub model: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            transport: None,
            user_agent: chatgpt_config::DEFAULT_USER_AGENT.to_string(),
            diagnostics: None,
            auto_refresh: true,
            api_base: DEFAULT_API_BASE.to_string(),
            backend_base: DEFAULT_BACKEND_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ClientOptions {
    /// Diagnostics go to stderr when enabled; callers that want a file install
    /// their own sink afterwards.
    pub fn from_config(config: &ClientConfig) -> Self {
        let options = Self {
            user_agent: config.user_agent().to_string(),
            auto_refresh: config.auto_refresh,
            api_base: config.api_base().to_string(),
            backend_base: config.backend_base().to_string(),
            model: config.model.clone(),
            ..Self::default()
        };
        if config.diagnostics {
            options.with_diagnostics(Arc::new(StderrSink))
        } else {
            options
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn without_diagnostics(mut self) -> Self {
        self.diagnostics = None;
        self
    }

    pub fn with_auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }

    /// Points both the auth and the conversation endpoints at `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.api_base = base_url.clone();
        self.backend_base = base_url;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

pub struct Client {
    conn: Connection,
    tokens: TokenManager,
    auto_refresh: bool,
    backend_base: String,
    model: String,
}

impl Client {
    pub fn new(credential: SessionCredential, options: ClientOptions) -> Self {
        let transport = options
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
        Self {
            conn: Connection::new(transport, options.user_agent, options.diagnostics),
            tokens: TokenManager::new(credential, options.api_base),
            auto_refresh: options.auto_refresh,
            backend_base: options.backend_base,
            model: options.model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn access_token(&self) -> Option<AccessToken> {
        self.tokens.current().await
    }

    /// Exchanges the session credential for a fresh access token right away.
    pub async fn auth(&self, cancel: &CancellationToken) -> Result<AccessToken, ClientError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.tokens.refresh(&self.conn) => result,
        }
    }

    /// Sends one conversation request and hands every decoded event to
    /// `handler`, in wire order, one at a time.
    ///
    /// Request-level failures return before any event is produced. Malformed
    /// payloads are passed to the handler and do not fail this call.
    pub async fn conversation<F>(
        &self,
        cancel: &CancellationToken,
        request: &ConversationRequest,
        mut handler: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(StreamEvent),
    {
        let exchange = async {
            if self.auto_refresh {
                self.tokens
                    .ensure_valid(&self.conn, chrono::Utc::now())
                    .await?;
            }
            let bearer = self.tokens.bearer().await?;

            let body =
                serde_json::to_vec(request).map_err(|e| ClientError::Transport(Box::new(e)))?;
            let http = HttpRequest::post(join_url(&self.backend_base, "conversation"))
                .header(AUTHORIZATION, &format!("Bearer {bearer}"))?
                .header(CONTENT_TYPE, "application/json")?
                .body(body);

            let response = self.conn.send(http).await?;
            if response.status != reqwest::StatusCode::OK {
                let status = response.status.as_u16();
                let body = response.text().await;
                return Err(ClientError::Remote { status, body });
            }

            let mut events = sse::decode(response.body);
            let mut delivered = 0usize;
            while let Some(event) = events.next().await {
                let event = event?;
                if cancel.is_cancelled() {
                    return Err(ClientError::Cancelled);
                }
                handler(event);
                delivered += 1;
            }
            tracing::debug!(events = delivered, "Conversation stream finished");
            Ok::<(), ClientError>(())
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = exchange => result,
        }
    }
}
