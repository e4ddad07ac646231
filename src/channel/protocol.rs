//! Wire codec for the event channel.
//!
//! Every text frame is a JSON envelope `{"event": <name>, "data": {...}}`.
//! `connect` and `disconnect` never appear as frames: they are the socket
//! opening and closing.

use serde::{Deserialize, Serialize};

use crate::utils::ClientError;

/// Events the server pushes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Uploaded files are processed, chat may begin
    ConnectionReady {
        #[serde(default)]
        message: String,
    },
    /// Answer to the last `chat_message`
    LlmResponse { answer: String },
    /// Server-side failure while handling a message
    Error {
        #[serde(default)]
        message: String,
    },
}

/// Events the client sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    ChatMessage { message: String },
}

const KNOWN_EVENTS: &[&str] = &["connection_ready", "llm_response", "error"];

#[derive(Deserialize)]
struct Envelope {
    event: String,
}

/// Decode one text frame. Unknown event names decode to `None`.
pub fn decode_frame(text: &str) -> Result<Option<ServerEvent>, ClientError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if !KNOWN_EVENTS.contains(&envelope.event.as_str()) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(text)?))
}

pub fn encode_frame(event: &ClientEvent) -> Result<String, ClientError> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_named_events() {
        assert_eq!(
            decode_frame(r#"{"event":"connection_ready","data":{"message":"Ready"}}"#).unwrap(),
            Some(ServerEvent::ConnectionReady {
                message: "Ready".to_string()
            })
        );
        assert_eq!(
            decode_frame(r#"{"event":"llm_response","data":{"answer":"X is..."}}"#).unwrap(),
            Some(ServerEvent::LlmResponse {
                answer: "X is...".to_string()
            })
        );
        assert_eq!(
            decode_frame(r#"{"event":"error","data":{}}"#).unwrap(),
            Some(ServerEvent::Error {
                message: String::new()
            })
        );
    }

    #[test]
    fn test_unknown_events_are_skipped() {
        assert_eq!(
            decode_frame(r#"{"event":"typing","data":{"who":"llm"}}"#).unwrap(),
            None
        );
        assert_eq!(decode_frame(r#"{"event":"connect"}"#).unwrap(), None);
    }

    #[test]
    fn test_malformed_frames_error() {
        assert!(decode_frame("hello").is_err());
        assert!(decode_frame(r#"{"data":{}}"#).is_err());
        // Known name, wrong payload
        assert!(decode_frame(r#"{"event":"llm_response","data":{"text":"x"}}"#).is_err());
    }

    #[test]
    fn test_encode_chat_message() {
        let frame = encode_frame(&ClientEvent::ChatMessage {
            message: "What is X?".to_string(),
        })
        .unwrap();
        assert_eq!(frame, r#"{"event":"chat_message","data":{"message":"What is X?"}}"#);
    }
}
