use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DecodeError;

pub const ACTION_NEXT: &str = "next";
pub const ROLE_USER: &str = "user";
pub const CONTENT_TYPE_TEXT: &str = "text";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRequest {
    pub action: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<String>,
    pub parent_message_id: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Content,
}

impl Message {
    pub fn user_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ROLE_USER.to_string(),
            content: Content {
                content_type: CONTENT_TYPE_TEXT.to_string(),
                parts: vec![text.into()],
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parts: Vec<String>,
}

/// One decoded `data: ` payload. Content is cumulative: each event carries the
/// whole reply so far, not a delta.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConversationResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: Message,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conversation_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
}

impl ConversationResponse {
    pub fn text(&self) -> Option<&str> {
        self.message.content.parts.first().map(String::as_str)
    }
}

#[derive(Debug)]
pub enum StreamEvent {
    Message(ConversationResponse),
    Malformed(DecodeError),
}

impl StreamEvent {
    pub fn message(&self) -> Option<&ConversationResponse> {
        match self {
            Self::Message(resp) => Some(resp),
            Self::Malformed(_) => None,
        }
    }

    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            Self::Message(_) => None,
            Self::Malformed(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_turn_request_omits_conversation_id() {
        let request = ConversationRequest {
            action: ACTION_NEXT.to_string(),
            messages: vec![Message::user_text("m0", "hello")],
            conversation_id: None,
            parent_message_id: "p0".to_string(),
            model: "text-davinci-002-render".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "action": "next",
                "messages": [{
                    "id": "m0",
                    "role": "user",
                    "content": {"content_type": "text", "parts": ["hello"]}
                }],
                "parent_message_id": "p0",
                "model": "text-davinci-002-render"
            })
        );
    }

    #[test]
    fn nulls_decode_to_empty_fields() {
        let resp: ConversationResponse = serde_json::from_value(json!({
            "message": {"id": "m1", "role": "assistant", "content": {"content_type": "text", "parts": null}},
            "conversation_id": "c1",
            "error": null
        }))
        .unwrap();
        assert_eq!(resp.message.id, "m1");
        assert!(resp.message.content.parts.is_empty());
        assert_eq!(resp.error, "");
        assert_eq!(resp.text(), None);
    }

    #[test]
    fn null_message_is_tolerated() {
        let resp: ConversationResponse =
            serde_json::from_str(r#"{"message":null,"conversation_id":null,"error":"busy"}"#)
                .unwrap();
        assert_eq!(resp.message, Message::default());
        assert_eq!(resp.error, "busy");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let resp: ConversationResponse = serde_json::from_str(
            r#"{"message":{"id":"m","role":"assistant","content":{"content_type":"text","parts":["hi"]},"end_turn":true,"weight":1.0},"conversation_id":"c","error":null}"#,
        )
        .unwrap();
        assert_eq!(resp.text(), Some("hi"));
    }
}
