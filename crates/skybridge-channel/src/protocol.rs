//! Wire envelope
//!
//! ```text
//! {type:"handshake-request",  sessionId}
//! {type:"handshake-response", sessionId}
//! {type:"call",     sessionId, requestId, method, args}
//! {type:"response", sessionId, requestId, result | error}
//! {type:"event",    sessionId, name, payload}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One protocol message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Envelope {
    HandshakeRequest {
        session_id: String,
    },
    HandshakeResponse {
        session_id: String,
    },
    Call {
        session_id: String,
        request_id: u64,
        method: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    Response {
        session_id: String,
        request_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
    Event {
        session_id: String,
        name: String,
        #[serde(default)]
        payload: Value,
    },
}

impl Envelope {
    pub fn session_id(&self) -> &str {
        match self {
            Envelope::HandshakeRequest { session_id }
            | Envelope::HandshakeResponse { session_id }
            | Envelope::Call { session_id, .. }
            | Envelope::Response { session_id, .. }
            | Envelope::Event { session_id, .. } => session_id,
        }
    }
}

/// Human-readable message of a remote rejection.
///
/// Remotes reject with a plain string or with a serialized error object.
pub(crate) fn error_message(error: &Value) -> String {
    match error {
        Value::String(msg) => msg.clone(),
        Value::Object(fields) => match fields.get("message").and_then(Value::as_str) {
            Some(msg) => msg.to_string(),
            None => error.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_wire_format() {
        let call = Envelope::Call {
            session_id: "s".to_string(),
            request_id: 3,
            method: "getProviderStatus".to_string(),
            args: vec![],
        };
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({"type": "call", "sessionId": "s", "requestId": 3, "method": "getProviderStatus", "args": []})
        );
    }

    #[test]
    fn test_response_without_result_decodes() {
        let msg: Envelope =
            serde_json::from_value(json!({"type": "response", "sessionId": "s", "requestId": 1}))
                .unwrap();
        assert_eq!(
            msg,
            Envelope::Response {
                session_id: "s".to_string(),
                request_id: 1,
                result: None,
                error: None,
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let msg = serde_json::from_value::<Envelope>(json!({"type": "hello", "sessionId": "s"}));
        assert!(msg.is_err());
    }

    #[test]
    fn test_error_message_forms() {
        assert_eq!(error_message(&json!("boom")), "boom");
        assert_eq!(error_message(&json!({"message": "bad"})), "bad");
        assert_eq!(error_message(&json!(7)), "7");
    }
}
