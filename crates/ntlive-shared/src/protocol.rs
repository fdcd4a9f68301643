//! Application framing carried inside the transport's generic data channel.
//!
//! Two payload shapes share one channel: chat frames produced by the chat
//! codec and tagged event envelopes such as [`GiftEvent`]. Every frame is
//! UTF-8 JSON; tagged envelopes carry a `channelId` discriminant and chat
//! frames never do, so both consumers classify a frame the same way through
//! [`Frame::decode`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::GIFT_CHANNEL_ID;
use crate::error::ProtocolError;
use crate::types::ChatMessage;

/// A gift broadcast: `{ "payload": <gift id>, "channelId": "gift" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftEvent {
    #[serde(default)]
    pub payload: String,
    pub channel_id: String,
}

impl GiftEvent {
    pub fn new(gift_id: impl Into<String>) -> Self {
        Self {
            payload: gift_id.into(),
            channel_id: GIFT_CHANNEL_ID.to_string(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Default chat codec frame: `{ "id", "message", "timestamp" }` with the
/// timestamp in Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFrame {
    pub id: String,
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ChatFrame {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a chat frame, refusing anything that carries a `channelId`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        match Frame::decode(data)? {
            Frame::Tagged { channel_id, .. } => Err(ProtocolError::ForeignChannel(channel_id)),
            Frame::Gift(_) => Err(ProtocolError::ForeignChannel(GIFT_CHANNEL_ID.to_string())),
            Frame::Untagged(value) => Ok(serde_json::from_value(value)?),
        }
    }
}

impl From<ChatMessage> for ChatFrame {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            message: m.message,
            timestamp: m.timestamp,
        }
    }
}

impl From<ChatFrame> for ChatMessage {
    fn from(f: ChatFrame) -> Self {
        Self {
            id: f.id,
            message: f.message,
            timestamp: f.timestamp,
        }
    }
}

/// Classification of one decoded data-channel payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Envelope whose discriminant is the gift tag.
    Gift(GiftEvent),
    /// Envelope with some other string discriminant.
    Tagged { channel_id: String, value: Value },
    /// JSON without a string `channelId`; chat traffic lands here.
    Untagged(Value),
}

impl Frame {
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(data)?;
        let value: Value = serde_json::from_str(text)?;

        let channel_id = value
            .get("channelId")
            .and_then(Value::as_str)
            .map(str::to_owned);

        match channel_id {
            Some(id) if id == GIFT_CHANNEL_ID => Ok(Frame::Gift(GiftEvent {
                payload: payload_text(value.get("payload")),
                channel_id: id,
            })),
            Some(channel_id) => Ok(Frame::Tagged { channel_id, value }),
            None => Ok(Frame::Untagged(value)),
        }
    }

    pub fn is_gift(&self) -> bool {
        matches!(self, Frame::Gift(_))
    }
}

/// The discriminant alone decides a gift; a non-string payload is kept as
/// its JSON text and a missing or null one becomes empty.
fn payload_text(payload: Option<&Value>) -> String {
    match payload {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gift_event_wire_shape() {
        let bytes = GiftEvent::new("gift").to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({ "payload": "gift", "channelId": "gift" }));
    }

    #[test]
    fn test_decode_routes_by_discriminant() {
        let gift = Frame::decode(br#"{"payload":"gift","channelId":"gift"}"#).unwrap();
        assert!(gift.is_gift());

        let other = Frame::decode(br#"{"payload":"x","channelId":"poll"}"#).unwrap();
        assert!(matches!(other, Frame::Tagged { ref channel_id, .. } if channel_id == "poll"));

        let numeric = Frame::decode(br#"{"channelId":7}"#).unwrap();
        assert!(matches!(numeric, Frame::Untagged(_)));
    }

    #[test]
    fn test_gift_without_payload_still_classified_as_gift() {
        let frame = Frame::decode(br#"{"channelId":"gift"}"#).unwrap();
        assert_eq!(frame, Frame::Gift(GiftEvent { payload: String::new(), channel_id: "gift".into() }));
    }

    #[test]
    fn test_gift_with_non_string_payload_is_still_gift() {
        let numeric = Frame::decode(br#"{"payload":7,"channelId":"gift"}"#).unwrap();
        assert_eq!(numeric, Frame::Gift(GiftEvent { payload: "7".into(), channel_id: "gift".into() }));

        let null = Frame::decode(br#"{"payload":null,"channelId":"gift"}"#).unwrap();
        assert_eq!(null, Frame::Gift(GiftEvent::new("")));

        let object = Frame::decode(br#"{"payload":{"id":"rose"},"channelId":"gift"}"#).unwrap();
        assert!(matches!(object, Frame::Gift(ref g) if g.payload == r#"{"id":"rose"}"#));
    }

    #[test]
    fn test_decode_rejects_invalid_payloads() {
        assert!(matches!(Frame::decode(&[0xff, 0xfe]), Err(ProtocolError::Utf8(_))));
        assert!(matches!(Frame::decode(b"hello"), Err(ProtocolError::Json(_))));
    }

    #[test]
    fn test_chat_text_that_looks_like_gift_is_still_chat() {
        let frame = ChatFrame::from(ChatMessage::new(r#"{"payload":"gift","channelId":"gift"}"#));
        let bytes = frame.to_bytes().unwrap();

        assert!(!Frame::decode(&bytes).unwrap().is_gift());
        let decoded = ChatFrame::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.message, frame.message);
    }

    #[test]
    fn test_chat_decoder_refuses_gift_frames() {
        let bytes = GiftEvent::new("gift").to_bytes().unwrap();
        assert!(matches!(
            ChatFrame::from_bytes(&bytes),
            Err(ProtocolError::ForeignChannel(ref c)) if c == "gift"
        ));
    }
}
