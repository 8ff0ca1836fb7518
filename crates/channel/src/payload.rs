//! Application payload bodies carried inside sealed records. JSON keeps the
//! bodies debuggable on either end of the bridge; the map type is ordered so
//! serialization round-trips byte-stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelError;

/// A request from the host, tagged by operation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Request {
    Evaluate {
        source: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        bindings: BTreeMap<String, Value>,
    },
    Sign {
        tx: Vec<u8>,
        key: Vec<u8>,
    },
}

/// A sealed reply: either the handler's value or an authenticated failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    #[serde(rename = "ok")]
    Ok(Value),
    #[serde(rename = "err")]
    Err(SealedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedError {
    pub kind: FailureKind,
    pub message: String,
}

/// Failure kinds that travel inside a sealed record. Transport-level
/// failures never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Timeout,
    Handler,
}

impl Request {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChannelError> {
        serde_json::to_vec(self).map_err(|_| ChannelError::MalformedPayload)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChannelError> {
        serde_json::from_slice(bytes).map_err(|_| ChannelError::MalformedPayload)
    }
}

impl Response {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChannelError> {
        serde_json::to_vec(self).map_err(|_| ChannelError::MalformedPayload)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChannelError> {
        serde_json::from_slice(bytes).map_err(|_| ChannelError::MalformedPayload)
    }

    pub fn timeout() -> Self {
        Response::Err(SealedError {
            kind: FailureKind::Timeout,
            message: "deadline exceeded".into(),
        })
    }

    pub fn handler_error(message: impl Into<String>) -> Self {
        Response::Err(SealedError {
            kind: FailureKind::Handler,
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_request_shape() {
        let req = Request::Evaluate {
            source: "40+2".into(),
            bindings: BTreeMap::new(),
        };
        let bytes = req.to_bytes().unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"{"op":"evaluate","source":"40+2"}"#
        );
        assert_eq!(Request::from_bytes(&bytes).unwrap(), req);
    }

    #[test]
    fn sign_request_roundtrips() {
        let req = Request::Sign {
            tx: vec![1, 2, 3],
            key: vec![9; 32],
        };
        let bytes = req.to_bytes().unwrap();
        assert_eq!(Request::from_bytes(&bytes).unwrap(), req);
    }

    #[test]
    fn response_shapes() {
        let ok = Response::Ok(serde_json::json!(42));
        assert_eq!(
            String::from_utf8(ok.to_bytes().unwrap()).unwrap(),
            r#"{"ok":42}"#
        );
        let err = Response::timeout();
        let parsed = Response::from_bytes(&err.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn unknown_op_is_malformed() {
        assert!(matches!(
            Request::from_bytes(br#"{"op":"format-disk"}"#),
            Err(ChannelError::MalformedPayload)
        ));
    }
}
