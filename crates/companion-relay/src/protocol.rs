//! Pairing wire protocol: JSON text frames tagged by `type`.

use companion_common::RelayError;
use serde::{Deserialize, Serialize};

/// Messages a peer sends to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    RequestCreate,

    RequestJoin {
        /// Optional so a missing code is reported as a bad request instead
        /// of an unparseable frame.
        #[serde(default)]
        code: Option<String>,
    },

    PayloadUpdate { payload: String },
}

impl ClientMessage {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Messages the broker sends to peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    CreateResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    JoinResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    PeerConnected { code: String },

    PeerDisconnected,

    SessionEnded { reason: String },

    PayloadUpdate {
        payload: String,
        /// Unix epoch milliseconds at relay time.
        #[serde(rename = "deliveredAt")]
        delivered_at: i64,
    },

    Error { message: String },
}

impl ServerMessage {
    pub fn created(code: &str) -> Self {
        ServerMessage::CreateResult {
            success: true,
            code: Some(code.to_string()),
            error: None,
        }
    }

    pub fn create_failed(err: &RelayError) -> Self {
        ServerMessage::CreateResult {
            success: false,
            code: None,
            error: Some(err.code().to_string()),
        }
    }

    pub fn joined(code: &str) -> Self {
        ServerMessage::JoinResult {
            success: true,
            code: Some(code.to_string()),
            error: None,
        }
    }

    pub fn join_failed(err: &RelayError) -> Self {
        ServerMessage::JoinResult {
            success: false,
            code: None,
            error: Some(err.code().to_string()),
        }
    }

    /// Payload update stamped with the current time.
    pub fn payload(payload: String) -> Self {
        ServerMessage::PayloadUpdate {
            payload,
            delivered_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn parses_request_create() {
        let msg = ClientMessage::parse(r#"{"type":"request-create"}"#).unwrap();
        assert_eq!(msg, ClientMessage::RequestCreate);
    }

    #[test]
    fn parses_request_join_with_and_without_code() {
        let msg = ClientMessage::parse(r#"{"type":"request-join","code":"k3x7qp"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::RequestJoin {
                code: Some("k3x7qp".into())
            }
        );

        let msg = ClientMessage::parse(r#"{"type":"request-join"}"#).unwrap();
        assert_eq!(msg, ClientMessage::RequestJoin { code: None });
    }

    #[test]
    fn parses_payload_update() {
        let msg =
            ClientMessage::parse(r#"{"type":"payload-update","payload":"print(1)"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::PayloadUpdate {
                payload: "print(1)".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_or_malformed_frames() {
        assert!(ClientMessage::parse("not json").is_err());
        assert!(ClientMessage::parse(r#"{"type":"launch-missiles"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"type":"payload-update"}"#).is_err());
    }

    #[test]
    fn create_result_shape() {
        let value: Value =
            serde_json::from_str(&ServerMessage::created("K3X7QP").to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "create-result", "success": true, "code": "K3X7QP"})
        );
    }

    #[test]
    fn join_failure_shape() {
        let msg = ServerMessage::join_failed(&RelayError::SessionOccupied);
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "join-result", "success": false, "error": "SessionOccupied"})
        );
    }

    #[test]
    fn payload_update_uses_delivered_at() {
        let msg = ServerMessage::payload("X".into());
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "payload-update");
        assert_eq!(value["payload"], "X");
        assert!(value["deliveredAt"].as_i64().unwrap() > 0);
    }

    #[test]
    fn notification_shapes() {
        let json = ServerMessage::PeerDisconnected.to_json().unwrap();
        assert_eq!(json, r#"{"type":"peer-disconnected"}"#);

        let json = ServerMessage::SessionEnded {
            reason: "Producer disconnected".into(),
        }
        .to_json()
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"session-ended","reason":"Producer disconnected"}"#
        );
    }
}
