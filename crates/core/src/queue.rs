//! Queue entry states and the retry/backoff policy applied to failed
//! deliveries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default maximum number of delivery attempts per entry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(2000);

/// Exponent cap so the computed delay cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 20;

/// Lifecycle of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Ready for delivery once `available_at` has passed.
    Waiting,
    /// Claimed by a worker and leased until `leased_until`.
    Active,
    /// Handler succeeded; never redelivered.
    Completed,
    /// Attempts exhausted; never redelivered automatically.
    Dead,
}

impl QueueState {
    /// Return the state name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Dead => "dead",
        }
    }

    /// Parse a stored state name. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(Self::Waiting),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "dead" => Some(Self::Dead),
            _ => None,
        }
    }

    /// All valid state values.
    pub const ALL: &'static [&'static str] = &["waiting", "active", "completed", "dead"];
}

/// What happens to an entry after a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Redeliver after `delay`.
    Retry { delay: Duration },
    /// No attempts left; the entry is dead.
    Exhausted,
}

/// Per-entry retry policy: bounded attempts with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
}

impl RetryPolicy {
    /// Build a policy. `max_attempts` counts the first delivery, so it must
    /// be at least 1.
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Result<Self, CoreError> {
        if max_attempts == 0 {
            return Err(CoreError::Validation(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            backoff_base,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    /// Delay before the next attempt after `attempts_made` failed attempts:
    /// `base * 2^(attempts_made - 1)`.
    pub fn backoff_delay(&self, attempts_made: u32) -> Duration {
        let exponent = attempts_made.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    /// Decide the fate of an entry whose latest attempt (number
    /// `attempts_made`) just failed.
    pub fn decide(&self, attempts_made: u32) -> RetryDecision {
        if attempts_made >= self.max_attempts {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry {
                delay: self.backoff_delay(attempts_made),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100)).unwrap();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(800));
    }

    #[test]
    fn backoff_never_overflows() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_secs(u64::MAX / 2)).unwrap();
        assert_eq!(policy.backoff_delay(u32::MAX), Duration::MAX);
    }

    #[test]
    fn decide_exhausts_at_max_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(1),
            RetryDecision::Retry {
                delay: DEFAULT_BACKOFF_BASE
            }
        );
        assert_eq!(policy.decide(2), RetryDecision::Exhausted);
        assert_eq!(policy.decide(3), RetryDecision::Exhausted);
    }

    #[test]
    fn single_attempt_policy_never_retries() {
        let policy = RetryPolicy::new(1, Duration::from_millis(10)).unwrap();
        assert_eq!(policy.decide(1), RetryDecision::Exhausted);
    }

    #[test]
    fn zero_attempts_rejected() {
        assert_matches!(
            RetryPolicy::new(0, Duration::from_secs(1)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn state_names_round_trip() {
        for name in QueueState::ALL {
            let state = QueueState::from_str(name).expect("known state");
            assert_eq!(state.as_str(), *name);
        }
    }
}
