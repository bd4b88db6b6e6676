//! Error taxonomy for gateway client operations.
//!
//! Every failure is classified into exactly one [`ClientError`] variant and
//! the original message is preserved. Retry eligibility is a pure function
//! of the variant (and, for response errors, the HTTP status).

use std::time::Duration;

use thiserror::Error;

/// HTTP statuses worth retrying: request timeout, throttling, and the
/// transient 5xx family.
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Cap on how much of a non-2xx body is carried into the error message.
const BODY_SNIPPET_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad local input, such as an unknown method or endpoint id. Never
    /// retried.
    #[error("invalid request: {0}")]
    Request(String),

    /// Transport-level failure: connection refused, DNS resolution, broken
    /// stream.
    #[error("connection error: {0}")]
    Connection(String),

    /// The attempt exceeded its per-attempt deadline.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The gateway replied, but with a non-2xx status, an unparseable body,
    /// an envelope-level error, or an envelope missing both result and
    /// error. `status` is absent when the HTTP exchange itself succeeded.
    #[error("gateway error: {message}")]
    Response {
        status: Option<u16>,
        code: Option<i64>,
        message: String,
    },

    /// The gateway signaled 429. `retry_after` carries the server's hint
    /// when the `retry-after` header was present.
    #[error("rate limited by gateway: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    /// 401 or 403. Never retried; the credential will not get better on its
    /// own.
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// Unclassified fallback, message preserved as-is.
    #[error("{0}")]
    Unknown(String),
}

impl ClientError {
    /// Retry table: timeouts and transport failures always retry; response
    /// errors retry only for specific statuses; everything else is
    /// terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Timeout(_) | ClientError::Connection(_) | ClientError::RateLimited { .. } => true,
            ClientError::Response { status: Some(status), .. } => RETRYABLE_STATUS_CODES.contains(status),
            _ => false,
        }
    }
}

/// Classifies a transport-level failure from the HTTP stack.
///
/// First match wins: timeout, then connection-layer causes, then body
/// decoding, then the unclassified fallback.
pub fn classify_transport(err: &reqwest::Error, timeout_ms: u64) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout(timeout_ms)
    } else if err.is_connect() || err.is_request() || err.is_redirect() {
        ClientError::Connection(err.to_string())
    } else if err.is_decode() || err.is_body() {
        ClientError::Response {
            status: None,
            code: None,
            message: format!("could not read gateway response: {err}"),
        }
    } else {
        ClientError::Unknown(err.to_string())
    }
}

/// Classifies a non-2xx gateway reply by status code.
pub fn classify_status(status: u16, retry_after: Option<Duration>, body: &str) -> ClientError {
    let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
    match status {
        401 | 403 => ClientError::Auth {
            status,
            message: if snippet.is_empty() {
                "credential rejected by gateway".to_string()
            } else {
                snippet
            },
        },
        429 => ClientError::RateLimited {
            retry_after,
            message: if snippet.is_empty() {
                "request quota exhausted".to_string()
            } else {
                snippet
            },
        },
        _ => ClientError::Response {
            status: Some(status),
            code: None,
            message: format!("HTTP {status}: {snippet}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_follow_the_table() {
        for status in RETRYABLE_STATUS_CODES {
            let err = ClientError::Response {
                status: Some(status),
                code: None,
                message: String::new(),
            };
            assert!(err.is_retryable(), "status {status} should be retryable");
        }
        for status in [400, 404, 418, 501] {
            let err = ClientError::Response {
                status: Some(status),
                code: None,
                message: String::new(),
            };
            assert!(!err.is_retryable(), "status {status} should be terminal");
        }
    }

    #[test]
    fn timeouts_and_connection_failures_are_retryable() {
        assert!(ClientError::Timeout(30_000).is_retryable());
        assert!(ClientError::Connection("connection refused".into()).is_retryable());
        assert!(
            ClientError::RateLimited {
                retry_after: None,
                message: "slow down".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn local_and_malformed_failures_are_terminal() {
        assert!(!ClientError::Request("unknown method".into()).is_retryable());
        assert!(!ClientError::Auth { status: 401, message: "nope".into() }.is_retryable());
        assert!(!ClientError::Unknown("???".into()).is_retryable());
        // Envelope-level and parse failures carry no HTTP status.
        assert!(
            !ClientError::Response {
                status: None,
                code: Some(-32000),
                message: "account not found".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn auth_statuses_classify_as_auth() {
        for status in [401, 403] {
            match classify_status(status, None, "denied") {
                ClientError::Auth { status: s, message } => {
                    assert_eq!(s, status);
                    assert_eq!(message, "denied");
                },
                other => panic!("expected auth error, got {other:?}"),
            }
        }
    }

    #[test]
    fn throttling_captures_the_retry_after_hint() {
        match classify_status(429, Some(Duration::from_secs(7)), "") {
            ClientError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            },
            other => panic!("expected rate-limit error, got {other:?}"),
        }
    }

    #[test]
    fn other_statuses_keep_the_code_and_body_snippet() {
        match classify_status(404, None, "no such account") {
            ClientError::Response { status, message, .. } => {
                assert_eq!(status, Some(404));
                assert!(message.contains("404"));
                assert!(message.contains("no such account"));
            },
            other => panic!("expected response error, got {other:?}"),
        }
    }

    #[test]
    fn long_bodies_are_truncated_in_messages() {
        let body = "x".repeat(5_000);
        match classify_status(500, None, &body) {
            ClientError::Response { message, .. } => assert!(message.len() < 300),
            other => panic!("expected response error, got {other:?}"),
        }
    }
}
