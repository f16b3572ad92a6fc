//! Retry policy with exponential backoff
//!
//! Deciding whether to re-invoke the downloader is split in two pure steps:
//! [`classify_failure`] turns the tool's diagnostic text into a
//! [`FailureKind`], and [`decide`] turns that kind plus the attempt number into
//! a [`RetryDecision`]. Neither touches processes or the clock, so the
//! orchestrator loop only has to act on the decision.
//!
//! # Example
//!
//! ```
//! use playlist_dl::config::RetryConfig;
//! use playlist_dl::retry::{classify_failure, decide, FailureKind, RetryDecision};
//!
//! let config = RetryConfig::default();
//! let kind = classify_failure("HTTP Error 404: Not Found");
//! assert_eq!(kind, FailureKind::NotFound);
//! assert_eq!(decide(kind, 0, &config), RetryDecision::PermanentFailure);
//! ```

use crate::config::RetryConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for failures that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the failure is transient and the attempt should be repeated
    fn is_retryable(&self) -> bool;
}

/// Category of a failed downloader invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Upstream throttling (HTTP 429 and friends)
    RateLimited,
    /// Content missing or URL rejected; never transient
    NotFound,
    /// Connection problems
    NetworkTransient,
    /// Anything else, including timeouts and empty results
    Unknown,
}

impl IsRetryable for FailureKind {
    fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::NotFound)
    }
}

const RATE_LIMIT_KEYWORDS: &[&str] = &["rate limit", "429", "too many requests"];
const NOT_FOUND_KEYWORDS: &[&str] = &["404", "not found", "invalid"];
const NETWORK_KEYWORDS: &[&str] = &["network", "connection", "timeout"];

/// Categorize the downloader's diagnostic output by keyword
///
/// Matching is a case-insensitive substring search. Categories are checked in
/// order (rate limit, not found, network) and the first hit wins.
pub fn classify_failure(diagnostic: &str) -> FailureKind {
    let text = diagnostic.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if matches(RATE_LIMIT_KEYWORDS) {
        FailureKind::RateLimited
    } else if matches(NOT_FOUND_KEYWORDS) {
        FailureKind::NotFound
    } else if matches(NETWORK_KEYWORDS) {
        FailureKind::NetworkTransient
    } else {
        FailureKind::Unknown
    }
}

/// A failed attempt: its category and the text explaining it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptFailure {
    /// Failure category
    pub kind: FailureKind,
    /// Diagnostic text (usually the tool's standard error)
    pub diagnostic: String,
}

impl AttemptFailure {
    /// Classify a diagnostic reported by the downloader
    pub fn from_diagnostic(diagnostic: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        Self {
            kind: classify_failure(&diagnostic),
            diagnostic,
        }
    }

    /// A failure of unknown category, regardless of the text
    pub fn unknown(diagnostic: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Unknown,
            diagnostic: diagnostic.into(),
        }
    }
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.diagnostic)
    }
}

/// What to do after a failed attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then try again
    RetryAfter(Duration),
    /// Do not retry; the condition is permanent
    PermanentFailure,
    /// Attempt budget used up
    Exhausted,
}

/// Compute the backoff delay before the given attempt
///
/// `base * 2^attempt` plus a uniform jitter in `[0, jitter)`, capped at `max`.
/// The result never exceeds `max`.
pub fn next_delay(attempt: u32, base: Duration, max: Duration, jitter: Duration) -> Duration {
    let exponential = 2u32
        .checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(max);

    exponential.saturating_add(add_jitter(jitter)).min(max)
}

/// Decide what follows a failed attempt
///
/// `attempt` is the 0-based index of the attempt that just failed. Not-found
/// failures are never retried. Rate-limited failures back off from twice the
/// base delay; every other retryable failure uses the base delay.
pub fn decide(kind: FailureKind, attempt: u32, config: &RetryConfig) -> RetryDecision {
    if !kind.is_retryable() {
        return RetryDecision::PermanentFailure;
    }
    if attempt.saturating_add(1) >= config.max_attempts {
        return RetryDecision::Exhausted;
    }

    let base = match kind {
        FailureKind::RateLimited => config.base_delay.saturating_mul(2),
        _ => config.base_delay,
    };

    RetryDecision::RetryAfter(next_delay(
        attempt + 1,
        base,
        config.max_delay,
        config.jitter,
    ))
}

/// Uniform random duration in `[0, bound)`
fn add_jitter(bound: Duration) -> Duration {
    if bound.is_zero() {
        return Duration::ZERO;
    }
    let mut rng = rand::thread_rng();
    let factor: f64 = rng.gen_range(0.0..1.0);
    Duration::from_secs_f64(bound.as_secs_f64() * factor)
}
