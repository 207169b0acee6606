use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chatgpt_auth::BoxError;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};

use crate::diagnostics::{self, DiagnosticSink};
use crate::ClientError;

pub type ByteStream = BoxStream<'static, Result<Bytes, BoxError>>;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Header values are marked sensitive when they carry credentials.
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, ClientError> {
        let mut value =
            HeaderValue::from_str(value).map_err(|e| ClientError::Transport(Box::new(e)))?;
        if name == reqwest::header::AUTHORIZATION || name == reqwest::header::COOKIE {
            value.set_sensitive(true);
        }
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl HttpResponse {
    /// Drains the body into memory.
    pub async fn collect_body(&mut self) -> Result<Bytes, BoxError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    pub async fn text(mut self) -> String {
        self.collect_body()
            .await
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }
}

/// The network client underneath [`Connection`]. Swap it out to route requests
/// through something other than `reqwest`, or to script responses in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Box::new(e) as BoxError))
            .boxed();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Attaches the identification header and mirrors traffic to the diagnostic
/// sink when one is configured.
#[derive(Clone)]
pub struct Connection {
    transport: Arc<dyn Transport>,
    user_agent: String,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl Connection {
    pub fn new(
        transport: Arc<dyn Transport>,
        user_agent: impl Into<String>,
        diagnostics: Option<Arc<dyn DiagnosticSink>>,
    ) -> Self {
        Self {
            transport,
            user_agent: user_agent.into(),
            diagnostics,
        }
    }

    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let request = request.header(USER_AGENT, &self.user_agent)?;
        tracing::debug!(method = %request.method, url = %request.url, "Sending request");

        if let Some(sink) = &self.diagnostics {
            sink.write(&diagnostics::dump_request(&request));
        }

        let mut response = self
            .transport
            .execute(request)
            .await
            .map_err(ClientError::Transport)?;
        tracing::debug!(status = %response.status, "Response headers received");

        if let Some(sink) = &self.diagnostics {
            let body = response
                .collect_body()
                .await
                .map_err(ClientError::StreamRead)?;
            sink.write(&diagnostics::dump_response(
                response.status,
                &response.headers,
                &body,
            ));
            response.body = stream::iter([Ok(body)]).boxed();
        }

        Ok(response)
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
