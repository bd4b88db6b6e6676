//! Advisory per-method rate-limit bookkeeping.
//!
//! The gateway enforces the real limits server-side; this ledger only lets
//! the client self-throttle and skip round trips that would certainly be
//! rejected. Updates are functional: `update_rate_limit` returns a new
//! ledger and never mutates its argument.

use std::collections::HashMap;

use chrono::Utc;

use super::envelope::RateLimitSnapshot;

/// Fallback ceiling for methods without a configured quota.
pub const DEFAULT_RATE_LIMIT: u32 = 60;

/// Window assumed when the gateway does not report one.
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitLedger {
    entries: HashMap<String, RateLimitEntry>,
}

/// Calls consumed in the current window and when the window rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    /// Milliseconds since the Unix epoch; the entry is stale once `now`
    /// passes this.
    pub reset_at_ms: u64,
}

impl RateLimitLedger {
    pub fn entry(&self, method_id: &str) -> Option<&RateLimitEntry> {
        self.entries.get(method_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn now_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Returns true if `method_id` may run now: no entry, an expired window, or
/// a count below the ceiling.
///
/// `quota` is the per-method allowance from the method descriptor;
/// [`DEFAULT_RATE_LIMIT`] applies when the caller has none.
pub fn check_rate_limit(method_id: &str, ledger: &RateLimitLedger, quota: Option<u32>) -> bool {
    check_rate_limit_at(method_id, ledger, quota, now_ms())
}

fn check_rate_limit_at(method_id: &str, ledger: &RateLimitLedger, quota: Option<u32>, now_ms: u64) -> bool {
    let ceiling = quota.unwrap_or(DEFAULT_RATE_LIMIT);
    match ledger.entry(method_id) {
        None => true,
        Some(entry) if now_ms >= entry.reset_at_ms => true,
        Some(entry) => entry.count < ceiling,
    }
}

/// Records a completed call for `method_id`, returning the updated ledger.
///
/// When the gateway supplied a snapshot it is authoritative:
/// `count = limit - remaining` and the reset timestamp is taken verbatim
/// (seconds on the wire, stored as milliseconds). Otherwise the entry is
/// incremented heuristically, starting a fresh 60-second window when the
/// previous one has lapsed.
pub fn update_rate_limit(
    method_id: &str,
    ledger: &RateLimitLedger,
    snapshot: Option<RateLimitSnapshot>,
) -> RateLimitLedger {
    update_rate_limit_at(method_id, ledger, snapshot, now_ms())
}

fn update_rate_limit_at(
    method_id: &str,
    ledger: &RateLimitLedger,
    snapshot: Option<RateLimitSnapshot>,
    now_ms: u64,
) -> RateLimitLedger {
    let entry = match snapshot {
        Some(snapshot) => RateLimitEntry {
            count: snapshot.limit.saturating_sub(snapshot.remaining),
            // `reset` comes off the wire; saturate rather than trust it.
            reset_at_ms: snapshot.reset.saturating_mul(1000),
        },
        None => match ledger.entry(method_id) {
            Some(previous) if now_ms < previous.reset_at_ms => RateLimitEntry {
                count: previous.count.saturating_add(1),
                reset_at_ms: previous.reset_at_ms,
            },
            _ => RateLimitEntry {
                count: 1,
                reset_at_ms: now_ms + DEFAULT_WINDOW_MS,
            },
        },
    };

    let mut next = ledger.clone();
    next.entries.insert(method_id.to_string(), entry);
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHOD: &str = "getBalance";
    const NOW: u64 = 1_700_000_000_000;

    fn ledger_with(count: u32, reset_at_ms: u64) -> RateLimitLedger {
        let mut ledger = RateLimitLedger::default();
        ledger
            .entries
            .insert(METHOD.to_string(), RateLimitEntry { count, reset_at_ms });
        ledger
    }

    #[test]
    fn fresh_method_is_allowed() {
        assert!(check_rate_limit_at(METHOD, &RateLimitLedger::default(), None, NOW));
    }

    #[test]
    fn ceiling_blocks_within_an_unexpired_window() {
        let ledger = ledger_with(DEFAULT_RATE_LIMIT, NOW + 30_000);
        assert!(!check_rate_limit_at(METHOD, &ledger, None, NOW));

        let under = ledger_with(DEFAULT_RATE_LIMIT - 1, NOW + 30_000);
        assert!(check_rate_limit_at(METHOD, &under, None, NOW));
    }

    #[test]
    fn expired_window_is_treated_as_fresh() {
        let ledger = ledger_with(DEFAULT_RATE_LIMIT, NOW - 1);
        assert!(check_rate_limit_at(METHOD, &ledger, None, NOW));
    }

    #[test]
    fn per_method_quota_overrides_the_default_ceiling() {
        let ledger = ledger_with(10, NOW + 30_000);
        assert!(!check_rate_limit_at(METHOD, &ledger, Some(10), NOW));
        assert!(check_rate_limit_at(METHOD, &ledger, Some(11), NOW));
        // The default ceiling of 60 would still allow it.
        assert!(check_rate_limit_at(METHOD, &ledger, None, NOW));
    }

    #[test]
    fn snapshot_updates_are_authoritative() {
        let ledger = ledger_with(3, NOW + 10_000);
        let snapshot = RateLimitSnapshot {
            remaining: 55,
            reset: 1_700_000_123,
            limit: 60,
        };
        let next = update_rate_limit_at(METHOD, &ledger, Some(snapshot), NOW);

        let entry = next.entry(METHOD).unwrap();
        assert_eq!(entry.count, 5);
        assert_eq!(entry.reset_at_ms, 1_700_000_123_000);
    }

    #[test]
    fn heuristic_update_increments_within_the_window() {
        let ledger = ledger_with(3, NOW + 10_000);
        let next = update_rate_limit_at(METHOD, &ledger, None, NOW);

        let entry = next.entry(METHOD).unwrap();
        assert_eq!(entry.count, 4);
        assert_eq!(entry.reset_at_ms, NOW + 10_000);
    }

    #[test]
    fn heuristic_update_starts_a_fresh_window_after_expiry() {
        let ledger = ledger_with(59, NOW - 5);
        let next = update_rate_limit_at(METHOD, &ledger, None, NOW);

        let entry = next.entry(METHOD).unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.reset_at_ms, NOW + DEFAULT_WINDOW_MS);
    }

    #[test]
    fn hostile_reset_values_saturate_instead_of_overflowing() {
        let snapshot = RateLimitSnapshot {
            remaining: 0,
            reset: u64::MAX,
            limit: 60,
        };
        let next = update_rate_limit_at(METHOD, &RateLimitLedger::default(), Some(snapshot), NOW);
        assert_eq!(next.entry(METHOD).unwrap().reset_at_ms, u64::MAX);
    }

    #[test]
    fn updates_never_mutate_the_original_ledger() {
        let ledger = ledger_with(3, NOW + 10_000);
        let before = ledger.clone();
        let _ = update_rate_limit_at(METHOD, &ledger, None, NOW);
        assert_eq!(ledger, before);
    }
}
