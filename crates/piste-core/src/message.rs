//! Protocol messages.
//!
//! Everything on the wire is a [`WireMessage`] serialized as JSON inside a
//! length-prefixed frame. Payloads ride as [`serde_json::Value`] so nested
//! structures and null travel unchanged.

use crate::error::SyncError;
use crate::identity::DeviceId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single operation call: catalogue name plus JSON arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub op: String,
    #[serde(default)]
    pub args: Value,
}

impl Call {
    pub fn new(op: impl Into<String>, args: Value) -> Self {
        Self {
            op: op.into(),
            args,
        }
    }
}

/// Typed error carried inside a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub code: String,
    pub message: String,
}

/// Messages exchanged between host and remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// First message on any connection: the remote introduces its device.
    Hello { device: DeviceId },
    /// Host's handshake reply with its own device id.
    Welcome { device: DeviceId },
    /// A call; ids are per-connection, monotonic, and restart after reconnect.
    Request { id: u64, op: String, args: Value },
    /// Reply to exactly one request on the same connection.
    Response {
        id: u64,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<WireError>,
    },
    /// Unsolicited change notification. At-most-once, never acknowledged.
    Push { topic: String, payload: Value },
}

impl WireMessage {
    pub fn request(id: u64, call: Call) -> Self {
        Self::Request {
            id,
            op: call.op,
            args: call.args,
        }
    }

    pub fn response_ok(id: u64, result: Value) -> Self {
        Self::Response {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn response_err(id: u64, err: &SyncError) -> Self {
        Self::Response {
            id,
            ok: false,
            result: None,
            error: Some(WireError {
                code: err.code().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_roundtrip() {
        let msg = WireMessage::request(
            7,
            Call::new("update_bout_scores", json!({"bout_id": 7, "score_a": 5, "score_b": 3})),
        );
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back: WireMessage = serde_json::from_slice(&bytes).unwrap();
        match back {
            WireMessage::Request { id, op, args } => {
                assert_eq!(id, 7);
                assert_eq!(op, "update_bout_scores");
                assert_eq!(args["score_a"], 5);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn response_omits_absent_fields() {
        let msg = WireMessage::response_ok(1, json!([1, 2, 3]));
        let text = serde_json::to_string(&msg).unwrap();
        assert!(!text.contains("error"));
        let failed = WireMessage::response_err(2, &SyncError::Unauthorized);
        let text = serde_json::to_string(&failed).unwrap();
        assert!(!text.contains("result"));
        assert!(text.contains("unauthorized"));
    }

    #[test]
    fn null_payload_survives() {
        let msg = WireMessage::Push {
            topic: "bouts:pool".into(),
            payload: json!({"pool": null, "nested": {"list": [null, 1]}}),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back: WireMessage = serde_json::from_slice(&bytes).unwrap();
        match back {
            WireMessage::Push { payload, .. } => {
                assert!(payload["pool"].is_null());
                assert!(payload["nested"]["list"][0].is_null());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
