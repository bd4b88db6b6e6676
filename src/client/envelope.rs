//! Wire envelopes for gateway requests and responses.
//!
//! Every call sends a [`RequestEnvelope`] as the JSON body and expects a
//! [`ResponseEnvelope`] back. The gateway populates exactly one of
//! `result`/`error`; a reply with neither is treated as a protocol error by
//! the client.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub params: Value,
    pub id: String,
    pub metadata: RequestMetadata,
}

/// Tracing and auth metadata attached to every outbound request.
///
/// Field names are camelCase on the wire (`apiKey`, `clientId`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub api_key: String,
    /// Submission time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
}

impl RequestEnvelope {
    /// Builds a fresh envelope with a new unique request id and the current
    /// timestamp. Envelopes are never reused across calls.
    pub fn new(params: Value, api_key: &str, client_id: Option<&str>, client_version: Option<&str>) -> Self {
        Self {
            params,
            id: generate_request_id(),
            metadata: RequestMetadata {
                api_key: api_key.to_string(),
                timestamp: Utc::now().timestamp_millis() as u64,
                client_id: client_id.map(str::to_string),
                client_version: client_version.map(str::to_string),
            },
        }
    }
}

/// Generates a request id of the form `<millis>-<random suffix>`.
///
/// The time component keeps ids roughly monotonic for log correlation; the
/// random suffix avoids collisions between calls issued in the same
/// millisecond.
pub fn generate_request_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", millis, &suffix[..8])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ResponseError>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitSnapshot>,
}

/// Rate-limit state reported by the gateway alongside a successful reply.
///
/// `reset` is seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub remaining: u32,
    pub reset: u64,
    pub limit: u32,
}
