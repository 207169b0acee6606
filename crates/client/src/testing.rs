//! In-process transport and sink used by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chatgpt_auth::BoxError;
use futures::stream::{self, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::diagnostics::DiagnosticSink;
use crate::transport::{HttpRequest, HttpResponse, Transport};

pub struct ScriptedResponse {
    status: u16,
    chunks: Vec<Result<Bytes, String>>,
    stall: bool,
    connect_error: Option<String>,
}

impl ScriptedResponse {
    pub fn ok(body: &str) -> Self {
        Self::chunks(200, &[body])
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self::chunks(status, &[body])
    }

    pub fn chunks(status: u16, chunks: &[&str]) -> Self {
        Self {
            status,
            chunks: chunks
                .iter()
                .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
                .collect(),
            stall: false,
            connect_error: None,
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            status: 0,
            chunks: Vec::new(),
            stall: false,
            connect_error: Some(message.to_string()),
        }
    }

    /// After the scripted chunks the body never yields again.
    pub fn then_stall(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn then_read_error(mut self, message: &str) -> Self {
        self.chunks.push(Err(message.to_string()));
        self
    }
}

pub fn session_body(token: &str, expires: &str) -> String {
    format!(r#"{{"user":{{}},"expires":"{expires}","accessToken":"{token}"}}"#)
}

pub fn event_line(conversation: &str, id: &str, text: &str) -> String {
    format!(
        "data: {{\"message\":{{\"id\":\"{id}\",\"role\":\"assistant\",\"content\":{{\"content_type\":\"text\",\"parts\":[\"{text}\"]}}}},\"conversation_id\":\"{conversation}\",\"error\":null}}\n\n"
    )
}

#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with(path))
            .collect()
    }

    pub fn json_body(request: &HttpRequest) -> serde_json::Value {
        serde_json::from_slice(request.body.as_deref().unwrap_or_default()).unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        self.requests.lock().unwrap().push(request);
        let scripted = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left");

        if let Some(message) = scripted.connect_error {
            return Err(message.into());
        }

        let chunks = stream::iter(
            scripted
                .chunks
                .into_iter()
                .map(|c| c.map_err(BoxError::from)),
        );
        let body = if scripted.stall {
            chunks.chain(stream::pending()).boxed()
        } else {
            chunks.boxed()
        };

        Ok(HttpResponse {
            status: StatusCode::from_u16(scripted.status).unwrap(),
            headers: HeaderMap::new(),
            body,
        })
    }
}

#[derive(Default)]
pub struct MemorySink {
    buf: Mutex<Vec<u8>>,
}

impl MemorySink {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl DiagnosticSink for MemorySink {
    fn write(&self, bytes: &[u8]) {
        self.buf.lock().unwrap().extend_from_slice(bytes);
    }
}
