//! Gateway protocol client: request/response envelopes, error
//! classification, retry policy, and the advisory rate-limit ledger.

mod envelope;
mod error;
mod gateway;
mod rate_limit;

pub use envelope::{
    RateLimitSnapshot, RequestEnvelope, RequestMetadata, ResponseEnvelope, ResponseError, ResponseMetadata,
    generate_request_id,
};
pub use error::{ClientError, RETRYABLE_STATUS_CODES, classify_status, classify_transport};
pub use gateway::{ClientOptions, GatewayClient};
pub use rate_limit::{
    DEFAULT_RATE_LIMIT, DEFAULT_WINDOW_MS, RateLimitEntry, RateLimitLedger, check_rate_limit, update_rate_limit,
};
