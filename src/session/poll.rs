//! Bounded polling with an injectable clock.
//!
//! The remote LRO offers no notifications, so the controller converges by
//! re-resolving status at a fixed interval until a predicate holds or the
//! attempt budget is spent. Each attempt is a fresh call of the step
//! function; nothing is carried between attempts except the last result.

use crate::env::polling;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Source of wall-clock time and delays
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

/// Real time, sleeping on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual time for tests: `sleep` returns immediately, advances `now` and
/// records the requested delay.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(duration).unwrap_or_default();
    }

    /// Every delay passed to `sleep`, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Polling and staleness settings as written in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
    pub stall_threshold_secs: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: polling::DEFAULT_INTERVAL_MS,
            max_attempts: polling::DEFAULT_MAX_ATTEMPTS,
            stall_threshold_secs: polling::DEFAULT_STALL_THRESHOLD_SECS,
        }
    }
}

impl PollingConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.interval_ms),
            max_attempts: self.max_attempts,
        }
    }
}

/// Interval and attempt budget of one convergence loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollingConfig::default().policy()
    }
}

/// How a poll loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollResult<T> {
    Reached { value: T, attempts: u32 },
    Exhausted { last: Option<T>, attempts: u32 },
    Cancelled { last: Option<T>, attempts: u32 },
}

/// Sleep one interval, run `step`, stop when `done` accepts the result.
///
/// Failed steps count as attempts and are logged; `last` only ever holds a
/// successful result. Cancellation is observed during the sleep and while a
/// step is in flight.
pub async fn poll_until<T, E, F, Fut, P>(
    clock: &dyn Clock,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut step: F,
    done: P,
) -> PollResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&T) -> bool,
{
    let mut last = None;

    for attempt in 1..=policy.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return PollResult::Cancelled { last, attempts: attempt - 1 };
            }
            _ = clock.sleep(policy.interval) => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return PollResult::Cancelled { last, attempts: attempt - 1 };
            }
            outcome = step(attempt) => outcome,
        };

        match outcome {
            Ok(value) => {
                if done(&value) {
                    return PollResult::Reached {
                        value,
                        attempts: attempt,
                    };
                }
                debug!("Poll attempt {}/{} not done", attempt, policy.max_attempts);
                last = Some(value);
            }
            Err(e) => warn!("Poll attempt {}/{} failed: {}", attempt, policy.max_attempts, e),
        }
    }

    PollResult::Exhausted {
        last,
        attempts: policy.max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn clock() -> ManualClock {
        ManualClock::new(Utc::now())
    }

    #[tokio::test]
    async fn test_reaches_target() {
        let clock = clock();
        let cancel = CancellationToken::new();
        let result = poll_until(
            &clock,
            &PollPolicy::default(),
            &cancel,
            |attempt| async move { Ok::<_, String>(attempt) },
            |value| *value == 3,
        )
        .await;

        assert_eq!(
            result,
            PollResult::Reached {
                value: 3,
                attempts: 3
            }
        );
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 3]);
    }

    #[tokio::test]
    async fn test_exhausts_budget() {
        let clock = clock();
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result = poll_until(
            &clock,
            &PollPolicy::default(),
            &cancel,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>("running") }
            },
            |value| *value == "terminated",
        )
        .await;

        assert_eq!(
            result,
            PollResult::Exhausted {
                last: Some("running"),
                attempts: 10
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(clock.sleeps().len(), 10);
    }

    #[tokio::test]
    async fn test_failed_steps_keep_last_success() {
        let clock = clock();
        let cancel = CancellationToken::new();
        let policy = PollPolicy {
            interval: Duration::from_millis(10),
            max_attempts: 3,
        };

        let result = poll_until(
            &clock,
            &policy,
            &cancel,
            |attempt| async move {
                if attempt == 1 {
                    Ok(1)
                } else {
                    Err("metadata unavailable")
                }
            },
            |_| false,
        )
        .await;

        assert_eq!(
            result,
            PollResult::Exhausted {
                last: Some(1),
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let clock = clock();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = poll_until(
            &clock,
            &PollPolicy::default(),
            &cancel,
            |_| async { Ok::<_, String>(()) },
            |_| true,
        )
        .await;

        assert_eq!(
            result,
            PollResult::Cancelled {
                last: None,
                attempts: 0
            }
        );
        assert!(clock.sleeps().is_empty());
    }
}
