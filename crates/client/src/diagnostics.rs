//! Raw request/response capture.
//!
//! Dumps follow the HTTP/1.1 wire layout (request line or status line, headers,
//! blank line, body). Credentials are written as-is: the sink sees exactly what
//! went over the wire.

use std::io::Write;
use std::sync::Mutex;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::transport::HttpRequest;

/// Destination for diagnostic dumps. Writes are best effort.
pub trait DiagnosticSink: Send + Sync {
    fn write(&self, bytes: &[u8]);
}

pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn write(&self, bytes: &[u8]) {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(bytes);
        let _ = stderr.flush();
    }
}

/// Wraps any writer, e.g. a log file opened by the binary.
pub struct WriterSink<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> DiagnosticSink for WriterSink<W> {
    fn write(&self, bytes: &[u8]) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writer.write_all(bytes);
            let _ = writer.flush();
        }
    }
}

pub fn dump_request(request: &HttpRequest) -> Vec<u8> {
    let (target, host) = match reqwest::Url::parse(&request.url) {
        Ok(url) => {
            let mut target = url.path().to_string();
            if let Some(query) = url.query() {
                target.push('?');
                target.push_str(query);
            }
            let host = match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                _ => String::new(),
            };
            (target, host)
        }
        Err(_) => (request.url.clone(), String::new()),
    };

    let mut out =
        format!("{} {target} HTTP/1.1\r\nHost: {host}\r\n", request.method).into_bytes();
    write_headers(&mut out, &request.headers);
    out.extend_from_slice(b"\r\n");
    if let Some(body) = &request.body {
        out.extend_from_slice(body);
    }
    out.push(b'\n');
    out
}

pub fn dump_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {} {}\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )
    .into_bytes();
    write_headers(&mut out, headers);
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out.push(b'\n');
    out
}

fn write_headers(out: &mut Vec<u8>, headers: &HeaderMap) {
    for (name, value) in headers {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
}
