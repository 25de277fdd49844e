//! JSON bodies exchanged between relay clients and the service.
//! Payloads travel as standard base64.

use crate::{MessageId, RelayError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/msg`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutRequest {
    #[serde(flatten)]
    pub id: MessageId,
    pub payload: String,
}

impl PutRequest {
    pub fn new(id: MessageId, payload: &[u8]) -> Self {
        Self {
            id,
            payload: encode_payload(payload),
        }
    }

    pub fn payload(&self) -> Result<Vec<u8>> {
        decode_payload(&self.payload)
    }
}

/// Body of `POST /v1/msg/take`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeRequest {
    #[serde(flatten)]
    pub id: MessageId,
}

/// Reply to a successful take
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeResponse {
    pub payload: String,
}

impl TakeResponse {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            payload: encode_payload(payload),
        }
    }

    pub fn payload(&self) -> Result<Vec<u8>> {
        decode_payload(&self.payload)
    }
}

/// Error body for every non-2xx reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn encode_payload(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(payload)
        .map_err(|e| RelayError::InvalidFormat(format!("invalid base64: {e}")))
}
