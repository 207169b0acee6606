use futures::stream::{BoxStream, StreamExt};

use crate::error::DecodeError;
use crate::transport::ByteStream;
use crate::types::{ConversationResponse, StreamEvent};
use crate::ClientError;

const DATA_PREFIX: &[u8] = b"data: ";
const DONE_SENTINEL: &[u8] = b"[DONE]";

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Skip,
    Done,
    Payload(&'a [u8]),
}

fn classify(line: &[u8]) -> Line<'_> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    match line.strip_prefix(DATA_PREFIX) {
        Some(payload) if payload == DONE_SENTINEL => Line::Done,
        Some(payload) => Line::Payload(payload),
        None => Line::Skip,
    }
}

fn decode_payload(payload: &[u8]) -> StreamEvent {
    match serde_json::from_slice::<ConversationResponse>(payload) {
        Ok(resp) => StreamEvent::Message(resp),
        Err(source) => StreamEvent::Malformed(DecodeError {
            raw: String::from_utf8_lossy(payload).into_owned(),
            source,
        }),
    }
}

struct LineReader {
    body: ByteStream,
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no `\n`.
    scanned: usize,
    eof: bool,
}

impl LineReader {
    fn new(body: ByteStream) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            scanned: 0,
            eof: false,
        }
    }

    /// Next complete line without its `\n`. At end of body the unterminated
    /// remainder counts as a line.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let found = self.buffer[self.scanned..].iter().position(|b| *b == b'\n');
        if let Some(offset) = found {
            let mut line: Vec<u8> = self.buffer.drain(..=self.scanned + offset).collect();
            line.pop();
            self.scanned = 0;
            return Some(line);
        }
        self.scanned = self.buffer.len();
        if self.eof && !self.buffer.is_empty() {
            self.scanned = 0;
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }
}

/// Turns a `data: `-framed body into conversation events.
///
/// Ends after `data: [DONE]` (the rest of the body is dropped), at end of body,
/// or after yielding a single `StreamRead` error. Payloads that fail to parse
/// come through as [`StreamEvent::Malformed`] and do not stop decoding.
pub fn decode(body: ByteStream) -> BoxStream<'static, Result<StreamEvent, ClientError>> {
    futures::stream::unfold(Some(LineReader::new(body)), |reader| async move {
        let mut reader = reader?;
        loop {
            if let Some(line) = reader.next_line() {
                match classify(&line) {
                    Line::Skip => continue,
                    Line::Done => return None,
                    Line::Payload(payload) => {
                        return Some((Ok(decode_payload(payload)), Some(reader)));
                    }
                }
            }

            if reader.eof {
                return None;
            }

            match reader.body.next().await {
                Some(Ok(chunk)) => reader.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Some((Err(ClientError::StreamRead(e)), None)),
                None => reader.eof = true,
            }
        }
    })
    .boxed()
}
