//! Wire framing.
//!
//! One frame carries one [`Message`]: the compact JSON header, then, when the
//! payload is non-empty, a single `\n` followed by the payload verbatim.
//! Decoding splits on the first newline only, so payloads may themselves
//! contain newlines.

use super::message::{Header, Message};
use crate::{BrokerError, Result};
use serde_json::Value;

/// Encode a message into a single text frame.
pub fn encode(message: &Message) -> Result<String> {
    let mut frame = serde_json::to_string(&message.header)?;
    if let Some(payload) = message.payload.as_deref().filter(|p| !p.is_empty()) {
        frame.reserve(payload.len() + 1);
        frame.push('\n');
        frame.push_str(payload);
    }
    Ok(frame)
}

/// Decode a text frame.
///
/// # Errors
///
/// Returns [`BrokerError::MalformedHeader`] when the header segment is not a
/// JSON object.
pub fn decode(frame: &str) -> Result<Message> {
    let (head, payload) = match frame.split_once('\n') {
        Some((head, payload)) => (head, Some(payload.to_string())),
        None => (frame, None),
    };

    let header = match serde_json::from_str::<Value>(head) {
        Ok(Value::Object(header)) => header,
        Ok(other) => {
            return Err(BrokerError::MalformedHeader(format!(
                "expected a JSON object, found {other}"
            )))
        }
        Err(err) => return Err(BrokerError::MalformedHeader(err.to_string())),
    };

    Ok(Message::from_parts(header, payload))
}

/// Header-only frame helper used for control messages.
pub(crate) fn header_only(header: Header) -> Message {
    Message::from_parts(header, None)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_header_only() {
        // ---
        let msg = Message::new().with_header("type", "ServiceRequest");
        assert_eq!(encode(&msg).unwrap(), r#"{"type":"ServiceRequest"}"#);
    }

    #[test]
    fn test_encode_empty_payload_is_header_only() {
        // ---
        let msg = Message::new().with_header("a", 1).with_payload("");
        assert_eq!(encode(&msg).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_encode_with_payload() {
        // ---
        let msg = Message::new().with_header("a", 1).with_payload("hello");
        assert_eq!(encode(&msg).unwrap(), "{\"a\":1}\nhello");
    }

    #[test]
    fn test_decode_splits_on_first_newline_only() {
        // ---
        let msg = decode("{\"x\":true}\nline one\nline two\n").unwrap();
        assert_eq!(msg.header.get("x"), Some(&json!(true)));
        assert_eq!(msg.payload.as_deref(), Some("line one\nline two\n"));
    }

    #[test]
    fn test_decode_without_newline_has_no_payload() {
        // ---
        let msg = decode(r#"{"type":"ServiceResponse","id":3}"#).unwrap();
        assert_eq!(msg.payload, None);
        assert_eq!(msg.id().map(|id| id.get()), Some(3));
    }

    #[test]
    fn test_frame_survives_decode_encode() {
        // ---
        let frame = "{\"type\":\"ServiceRequest\",\"service\":{\"name\":\"#chat\"},\"id\":12}\nhi\nthere";
        assert_eq!(encode(&decode(frame).unwrap()).unwrap(), frame);
    }

    #[test]
    fn test_message_survives_encode_decode() {
        // ---
        let msg = Message::new()
            .with_header("zeta", json!([1, 2, 3]))
            .with_header("alpha", json!({"nested": null}))
            .with_payload("{not json}\n");
        assert_eq!(decode(&encode(&msg).unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        // ---
        let err = decode("{not json\npayload").unwrap_err();
        assert!(matches!(err, BrokerError::MalformedHeader(_)));
    }

    #[test]
    fn test_decode_rejects_non_object_header() {
        // ---
        let err = decode("[1,2]").unwrap_err();
        assert!(matches!(err, BrokerError::MalformedHeader(_)));
    }
}
