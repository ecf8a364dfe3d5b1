use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, Request, Response, StatusCode};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{DevlicaError, Result};

/// Attempts per request before a rate-limited call gives up.
pub const MAX_ATTEMPTS: u32 = 3;
/// Waits at or beyond this horizon are not worth sleeping through.
pub const MAX_WAIT: Duration = Duration::from_secs(15 * 60);
/// Remaining-quota level below which the transport pauses until reset.
pub const LOW_QUOTA_THRESHOLD: u64 = 10;

const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";
const HEADER_RETRY_AFTER: &str = "retry-after";

/// What to do with a response, decided from its status and quota headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Hand the response to the caller.
    Pass,
    /// Quota is nearly spent: sleep, then hand the response to the caller.
    PauseThenPass {
        /// Requests left in the current window
        remaining: u64,
        /// Sleep duration (time to reset plus one second)
        wait: Duration,
    },
    /// Rate-limited with a usable `Retry-After`: sleep and resend.
    Retry {
        /// Sleep duration before resending
        wait: Duration,
    },
    /// Rate-limited without a usable `Retry-After`: caller handles the failure.
    GiveUp,
}

impl RateLimitDecision {
    /// Inspects a response's status and headers at instant `now`.
    pub fn evaluate(status: StatusCode, headers: &HeaderMap, now: DateTime<Utc>) -> Self {
        let rate_limited =
            status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS;

        if rate_limited {
            return match header_i64(headers, HEADER_RETRY_AFTER) {
                Some(secs) if secs > 0 && (secs as u64) < MAX_WAIT.as_secs() => Self::Retry {
                    wait: Duration::from_secs(secs as u64),
                },
                _ => Self::GiveUp,
            };
        }

        let Some(remaining) = header_i64(headers, HEADER_REMAINING) else {
            return Self::Pass;
        };
        if remaining < 0 || remaining as u64 >= LOW_QUOTA_THRESHOLD {
            return Self::Pass;
        }
        let Some(reset) = header_i64(headers, HEADER_RESET)
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        else {
            return Self::Pass;
        };
        match (reset - now).to_std() {
            Ok(until_reset) if !until_reset.is_zero() && until_reset < MAX_WAIT => {
                Self::PauseThenPass {
                    remaining: remaining as u64,
                    wait: until_reset + Duration::from_secs(1),
                }
            }
            _ => Self::Pass,
        }
    }
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
}

/// Sleeps for `duration` unless `cancel` fires first.
pub async fn sleep_cancellable(cancel: &CancellationToken, duration: Duration) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(DevlicaError::Cancelled),
        _ = sleep(duration) => Ok(()),
    }
}

/// Sends requests while honoring the upstream API's rate-limit signals.
///
/// Proactively pauses when the quota is nearly spent and retries responses
/// that carry a short `Retry-After`. All sleeps observe the cancellation token.
#[derive(Clone)]
pub struct RateLimiter {
    client: Client,
    cancel: CancellationToken,
}

impl RateLimiter {
    /// Creates a transport over `client` bound to `cancel`
    pub fn new(client: Client, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Returns the cancellation token every sleep observes
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Executes `request`, retrying on rate limits up to [`MAX_ATTEMPTS`] times.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        for attempt in 1..=MAX_ATTEMPTS {
            if self.cancel.is_cancelled() {
                return Err(DevlicaError::Cancelled);
            }
            let outgoing = request.try_clone().ok_or_else(|| {
                DevlicaError::Network(format!("request to {} cannot be retried", request.url()))
            })?;
            let response = tokio::select! {
                _ = self.cancel.cancelled() => return Err(DevlicaError::Cancelled),
                sent = self.client.execute(outgoing) => sent?,
            };

            match RateLimitDecision::evaluate(response.status(), response.headers(), Utc::now()) {
                RateLimitDecision::Pass | RateLimitDecision::GiveUp => return Ok(response),
                RateLimitDecision::PauseThenPass { remaining, wait } => {
                    warn!(
                        remaining,
                        wait_secs = wait.as_secs(),
                        url = %request.url(),
                        "approaching github rate limit, pausing"
                    );
                    sleep_cancellable(&self.cancel, wait).await?;
                    return Ok(response);
                }
                RateLimitDecision::Retry { wait } => {
                    warn!(
                        retry_after = wait.as_secs(),
                        attempt,
                        url = %request.url(),
                        "rate limited, retrying"
                    );
                    drop(response);
                    sleep_cancellable(&self.cancel, wait).await?;
                }
            }
        }

        Err(DevlicaError::RateLimitExceeded(format!(
            "retries exhausted after {} attempts for {}",
            MAX_ATTEMPTS,
            request.url()
        )))
    }
}
