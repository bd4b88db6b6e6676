//! The gateway protocol client.
//!
//! [`GatewayClient::execute`] resolves a method against the registry, posts
//! a request envelope to `{base}/rpc/{method}`, races each attempt against
//! a deadline, classifies failures, and retries transient ones with capped
//! exponential backoff and jitter. Completed calls feed the advisory
//! rate-limit ledger.

use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::Rng;
use reqwest::header::RETRY_AFTER;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;
use url::Url;

use crate::registry::{Endpoint, Network, Registry};

use super::envelope::{RateLimitSnapshot, RequestEnvelope, ResponseEnvelope};
use super::error::{ClientError, classify_status, classify_transport};
use super::rate_limit::{RateLimitEntry, RateLimitLedger, check_rate_limit, update_rate_limit};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 500;
const DEFAULT_MAX_DELAY_MS: u64 = 8_000;

/// Tunables for a [`GatewayClient`].
///
/// `timeout` bounds each attempt, not the whole call: a call may take up to
/// `retry_attempts * timeout` plus backoff sleeps before it fails. Lower
/// `retry_attempts` if that worst case matters to you.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    /// Total delivery attempts per call, including the first.
    pub retry_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// When set, every attempt is logged (method, attempt number, masked
    /// credential, timing). Purely observational.
    pub debug: bool,
    pub client_id: Option<String>,
    pub client_version: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            debug: false,
            client_id: None,
            client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }
}

pub struct GatewayClient {
    registry: Registry,
    http: reqwest::Client,
    api_key: RwLock<String>,
    endpoint: RwLock<Endpoint>,
    ledger: RwLock<RateLimitLedger>,
    options: ClientOptions,
}

impl GatewayClient {
    /// Creates a client targeting `network`'s default endpoint.
    pub fn new(
        registry: Registry,
        network: Network,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let endpoint = registry
            .default_endpoint(network)
            .cloned()
            .ok_or_else(|| ClientError::Request(format!("no default endpoint configured for network '{network}'")))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Connection(format!("could not build HTTP client: {e}")))?;

        Ok(Self {
            registry,
            http,
            api_key: RwLock::new(api_key.into()),
            endpoint: RwLock::new(endpoint),
            ledger: RwLock::new(RateLimitLedger::default()),
            options,
        })
    }

    /// Switches the active endpoint. Calls already in flight keep the
    /// endpoint they started with.
    pub async fn set_endpoint(&self, endpoint_id: &str) -> Result<(), ClientError> {
        let endpoint = self
            .registry
            .endpoint(endpoint_id)
            .cloned()
            .ok_or_else(|| ClientError::Request(format!("unknown endpoint '{endpoint_id}'")))?;
        *self.endpoint.write().await = endpoint;
        Ok(())
    }

    /// Replaces the credential used for subsequent calls.
    pub async fn set_api_key(&self, api_key: impl Into<String>) {
        *self.api_key.write().await = api_key.into();
    }

    pub async fn active_endpoint(&self) -> Endpoint {
        self.endpoint.read().await.clone()
    }

    /// Advisory pre-flight check against the local ledger. The gateway
    /// still enforces the real quota.
    pub async fn within_rate_limit(&self, method_id: &str) -> bool {
        let quota = self.registry.method(method_id).map(|m| m.rate_limit);
        let ledger = self.ledger.read().await;
        check_rate_limit(method_id, &ledger, quota)
    }

    /// Current ledger entry for a method, if any call has completed.
    pub async fn rate_limit_entry(&self, method_id: &str) -> Option<RateLimitEntry> {
        self.ledger.read().await.entry(method_id).copied()
    }

    /// Executes a named gateway method and returns its result payload.
    ///
    /// Fails fast with a request error when the method id is unknown —
    /// nothing is sent. Otherwise delivery is attempted up to
    /// `retry_attempts` times; only the final classified error surfaces to
    /// the caller.
    pub async fn execute(&self, method_id: &str, params: Value) -> Result<Value, ClientError> {
        let descriptor = self
            .registry
            .method(method_id)
            .ok_or_else(|| ClientError::Request(format!("unknown method '{method_id}'")))?;
        let quota = descriptor.rate_limit;
        let requires_auth = descriptor.requires_auth;

        let endpoint = self.endpoint.read().await.clone();
        let api_key = self.api_key.read().await.clone();

        if requires_auth && api_key.is_empty() {
            warn!(method = method_id; "method requires a credential but none is set");
        }

        {
            let ledger = self.ledger.read().await;
            if !check_rate_limit(method_id, &ledger, Some(quota)) {
                warn!(method = method_id, quota = quota; "local rate-limit budget exhausted for method");
            }
        }

        let url = endpoint
            .url
            .join(&format!("rpc/{method_id}"))
            .map_err(|e| ClientError::Request(format!("could not build request URL: {e}")))?;

        let envelope = RequestEnvelope::new(
            params,
            &api_key,
            self.options.client_id.as_deref(),
            self.options.client_version.as_deref(),
        );

        let attempts = self.options.retry_attempts.max(1);
        let timeout_ms = self.options.timeout.as_millis() as u64;
        let mut attempt = 1;
        loop {
            if self.options.debug {
                debug!(
                    method = method_id,
                    attempt = attempt,
                    request_id = &*envelope.id,
                    api_key = &*mask_api_key(&api_key);
                    "dispatching gateway request"
                );
            }

            let started = Instant::now();
            // The race covers the whole exchange: connect, headers, and
            // body read. A gateway that stalls mid-body still times out.
            let outcome = match tokio::time::timeout(self.options.timeout, self.attempt(&url, &api_key, &envelope)).await
            {
                Err(_) => Err(ClientError::Timeout(timeout_ms)),
                Ok(outcome) => outcome,
            };
            match outcome {
                Ok((result, snapshot)) => {
                    if self.options.debug {
                        debug!(
                            method = method_id,
                            attempt = attempt,
                            elapsed_ms = started.elapsed().as_millis() as u64;
                            "gateway request succeeded"
                        );
                    }
                    let mut ledger = self.ledger.write().await;
                    *ledger = update_rate_limit(method_id, &ledger, snapshot);
                    return Ok(result);
                },
                Err(error) => {
                    if attempt >= attempts || !error.is_retryable() {
                        return Err(error);
                    }

                    let mut delay = backoff_delay(attempt, self.options.base_delay, self.options.max_delay);
                    if let ClientError::RateLimited {
                        retry_after: Some(hint), ..
                    } = &error
                    {
                        // Server hint is a floor, not a replacement.
                        delay = delay.max(*hint);
                    }

                    warn!(
                        method = method_id,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error:% = error;
                        "gateway request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
            }
        }
    }

    /// One delivery attempt: send, read, and classify whatever comes back.
    /// The caller bounds this whole future with the per-attempt deadline.
    async fn attempt(
        &self,
        url: &Url,
        api_key: &str,
        envelope: &RequestEnvelope,
    ) -> Result<(Value, Option<RateLimitSnapshot>), ClientError> {
        let timeout_ms = self.options.timeout.as_millis() as u64;

        let response = self
            .http
            .post(url.clone())
            .bearer_auth(api_key)
            .json(envelope)
            .send()
            .await
            .map_err(|e| classify_transport(&e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read response body".to_string());
            return Err(classify_status(status.as_u16(), retry_after, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(&e, timeout_ms))?;
        let reply: ResponseEnvelope = serde_json::from_str(&body).map_err(|e| ClientError::Response {
            status: None,
            code: None,
            message: format!("gateway returned invalid JSON: {e}"),
        })?;

        if let Some(error) = reply.error {
            return Err(ClientError::Response {
                status: None,
                code: Some(error.code),
                message: error.message,
            });
        }

        let snapshot = reply.metadata.and_then(|m| m.rate_limit);
        match reply.result {
            Some(result) => Ok((result, snapshot)),
            None => Err(ClientError::Response {
                status: None,
                code: None,
                message: "gateway reply carried neither result nor error".to_string(),
            }),
        }
    }

    // Convenience wrappers. Parameter names below are the exact keys the
    // gateway expects; changing them breaks dispatch server-side.

    pub async fn get_account_info(&self, address: &str) -> Result<Value, ClientError> {
        self.execute("getAccountInfo", json!({ "address": address })).await
    }

    pub async fn get_balance(&self, address: &str) -> Result<Value, ClientError> {
        self.execute("getBalance", json!({ "address": address })).await
    }

    pub async fn get_transaction(&self, signature: &str) -> Result<Value, ClientError> {
        self.execute("getTransaction", json!({ "signature": signature })).await
    }

    pub async fn get_token_accounts(&self, owner: &str) -> Result<Value, ClientError> {
        self.execute("getTokenAccounts", json!({ "owner": owner })).await
    }

    pub async fn get_signatures_for_address(&self, address: &str, limit: Option<u32>) -> Result<Value, ClientError> {
        let mut params = Map::new();
        params.insert("address".to_string(), json!(address));
        if let Some(limit) = limit {
            params.insert("limit".to_string(), json!(limit));
        }
        self.execute("getSignaturesForAddress", Value::Object(params)).await
    }

    pub async fn get_program_data(&self, program_id: &str) -> Result<Value, ClientError> {
        self.execute("getProgramData", json!({ "programId": program_id })).await
    }

    pub async fn get_version(&self) -> Result<Value, ClientError> {
        self.execute("getVersion", json!({})).await
    }

    pub async fn get_network_status(&self) -> Result<Value, ClientError> {
        self.execute("getNetworkStatus", json!({})).await
    }

    pub async fn get_cluster_status(&self) -> Result<Value, ClientError> {
        self.execute("getClusterStatus", json!({})).await
    }
}

/// Backoff before retry number `attempt + 1`:
/// `min(base * 2^(attempt-1), max)` with ±20 % jitter.
fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    let exp_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let capped_ms = exp_ms.min(max.as_millis() as u64);

    let jitter_range = capped_ms / 5;
    let jitter = rand::thread_rng().gen_range(0..=jitter_range);
    let final_ms = if rand::thread_rng().gen_bool(0.5) {
        capped_ms + jitter
    } else {
        capped_ms.saturating_sub(jitter)
    };

    Duration::from_millis(final_ms)
}

/// Parses a `retry-after` header. Only the delta-seconds form is handled;
/// an HTTP-date value yields `None` and the retry falls back to the normal
/// backoff schedule.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 6 {
        return "******".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_within_jitter_bounds() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(8);

        for (attempt, expected_ms) in [(1u32, 500u64), (2, 1_000), (3, 2_000), (4, 4_000)] {
            for _ in 0..50 {
                let delay = backoff_delay(attempt, base, max).as_millis() as u64;
                let low = expected_ms - expected_ms / 5;
                let high = expected_ms + expected_ms / 5;
                assert!(
                    (low..=high).contains(&delay),
                    "attempt {attempt}: delay {delay} outside [{low}, {high}]"
                );
            }
        }
    }

    #[test]
    fn backoff_is_capped_at_max_delay() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(8);

        for _ in 0..50 {
            let delay = backoff_delay(10, base, max).as_millis() as u64;
            // Cap plus at most 20 % jitter.
            assert!(delay <= 8_000 + 8_000 / 5);
        }
    }

    #[test]
    fn masked_keys_never_leak_the_middle() {
        assert_eq!(mask_api_key(""), "******");
        assert_eq!(mask_api_key("short"), "******");
        let masked = mask_api_key("sk-live-abcdef123456");
        assert_eq!(masked, "sk-...456");
        assert!(!masked.contains("abcdef"));
    }

    #[test]
    fn retry_after_header_parses_seconds() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, "not-a-number".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);
        assert_eq!(parse_retry_after(&reqwest::header::HeaderMap::new()), None);

        // HTTP-date form is not parsed; backoff schedule applies instead.
        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2026 07:28:00 GMT".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn default_options_match_documented_values() {
        let options = ClientOptions::default();
        assert_eq!(options.timeout, Duration::from_millis(30_000));
        assert_eq!(options.retry_attempts, 3);
        assert!(!options.debug);
    }
}
