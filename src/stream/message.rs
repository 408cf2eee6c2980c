use serde::Deserialize;
use serde_json::Value;

use crate::FeedError;

/// One decoded frame of the push protocol.
///
/// Payloads are kept as raw JSON; the [`Dispatcher`](super::Dispatcher) decodes them per tag so a
/// malformed payload never prevents an `end` frame from being recognised.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    /// A page of a backfill.
    Events { data: Value, page: u64, total: u64 },
    /// A single live event.
    NewEvent { data: Value },
    /// A failure reported by the service.
    Error { message: String },
    /// Graceful end of the stream.
    End { message: Option<String> },
    Heartbeat,
    /// Informational text from the service.
    Info { message: String },
}

/// Wire shape shared by every tag. Every field but `type` is optional and loosely typed.
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    page: Option<Value>,
    #[serde(default)]
    total: Option<Value>,
}

impl StreamMessage {
    pub const EVENTS: &'static str = "events";
    pub const NEW_EVENT: &'static str = "new_event";
    pub const ERROR: &'static str = "error";
    pub const END: &'static str = "end";
    pub const HEARTBEAT: &'static str = "heartbeat";
    pub const INFO: &'static str = "info";

    /// Decodes one text or binary frame.
    ///
    /// # Errors
    ///
    /// * [`FeedError::Decode`] - if the frame is not a JSON object with a string `type`.
    /// * [`FeedError::Protocol`] - if the tag is unknown or a `new_event` frame has no `data`.
    pub fn decode(bytes: &[u8]) -> Result<Self, FeedError> {
        let frame: Frame = serde_json::from_slice(bytes)?;
        let message = frame.message.as_ref().and_then(text);

        match frame.kind.as_str() {
            Self::EVENTS => Ok(StreamMessage::Events {
                data: frame.data.unwrap_or(Value::Null),
                page: frame.page.as_ref().and_then(Value::as_u64).unwrap_or_default(),
                total: frame.total.as_ref().and_then(Value::as_u64).unwrap_or_default(),
            }),
            Self::NEW_EVENT => match frame.data {
                Some(data) if !data.is_null() => Ok(StreamMessage::NewEvent { data }),
                _ => Err(FeedError::Protocol("new_event frame without data".into())),
            },
            Self::ERROR => Ok(StreamMessage::Error { message: message.unwrap_or_default() }),
            Self::END => Ok(StreamMessage::End { message }),
            Self::HEARTBEAT => Ok(StreamMessage::Heartbeat),
            Self::INFO => Ok(StreamMessage::Info { message: message.unwrap_or_default() }),
            other => Err(FeedError::Protocol(format!("unknown message type `{other}`"))),
        }
    }

    /// The frame's tag as it appears on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Events { .. } => Self::EVENTS,
            StreamMessage::NewEvent { .. } => Self::NEW_EVENT,
            StreamMessage::Error { .. } => Self::ERROR,
            StreamMessage::End { .. } => Self::END,
            StreamMessage::Heartbeat => Self::HEARTBEAT,
            StreamMessage::Info { .. } => Self::INFO,
        }
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_events_frame() {
        let message = StreamMessage::decode(
            br#"{"type":"events","data":[{"id":1},{"id":2}],"page":3,"total":250}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            StreamMessage::Events { data: json!([{"id": 1}, {"id": 2}]), page: 3, total: 250 }
        );
    }

    #[test]
    fn decodes_error_frame() {
        let message = StreamMessage::decode(br#"{"type":"error","message":"rate limited"}"#).unwrap();
        assert_eq!(message, StreamMessage::Error { message: "rate limited".into() });
    }

    #[test]
    fn end_ignores_payload() {
        assert_eq!(
            StreamMessage::decode(br#"{"type":"end"}"#).unwrap(),
            StreamMessage::End { message: None }
        );
        assert_eq!(
            StreamMessage::decode(br#"{"type":"end","data":"garbage","page":"x","message":7}"#)
                .unwrap(),
            StreamMessage::End { message: Some("7".into()) }
        );
    }

    #[test]
    fn heartbeat_and_info_are_recognised() {
        assert_eq!(StreamMessage::decode(br#"{"type":"heartbeat"}"#).unwrap(), StreamMessage::Heartbeat);
        assert_eq!(
            StreamMessage::decode(br#"{"type":"info","message":"catching up"}"#).unwrap().kind(),
            "info"
        );
    }

    #[test]
    fn unknown_tag_is_a_protocol_error() {
        let err = StreamMessage::decode(br#"{"type":"snapshot"}"#).unwrap_err();
        assert!(matches!(err, FeedError::Protocol(ref text) if text.contains("snapshot")));
    }

    #[test]
    fn new_event_requires_data() {
        let err = StreamMessage::decode(br#"{"type":"new_event","data":null}"#).unwrap_err();
        assert!(matches!(err, FeedError::Protocol(_)));
    }

    #[test]
    fn malformed_frame_is_a_decode_error() {
        assert!(matches!(StreamMessage::decode(b"not json"), Err(FeedError::Decode(_))));
        assert!(matches!(StreamMessage::decode(br#"{"message":"no tag"}"#), Err(FeedError::Decode(_))));
    }
}
