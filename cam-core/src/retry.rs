/// Retry schedule for network bring-up
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Keep trying at a fixed interval, never give up
    Forever { interval_ms: u64 },
    /// Doubling delay capped at `max_delay_ms`, give up after `max_attempts`
    Backoff {
        initial_ms: u64,
        max_delay_ms: u64,
        max_attempts: u32,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Forever { interval_ms: 500 }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    /// `None` means the policy is exhausted.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        match *self {
            RetryPolicy::Forever { interval_ms } => Some(Duration::from_millis(interval_ms)),
            RetryPolicy::Backoff {
                initial_ms,
                max_delay_ms,
                max_attempts,
            } => {
                if attempt >= max_attempts {
                    return None;
                }
                let shift = attempt.saturating_sub(1).min(31);
                let delay = initial_ms.saturating_mul(1u64 << shift).min(max_delay_ms);
                Some(Duration::from_millis(delay))
            }
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, RetryPolicy::Backoff { .. })
    }
}

#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Debug> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempts, last error: {:?}",
            self.attempts, self.last_error
        )
    }
}

impl<E: fmt::Debug> std::error::Error for RetryExhausted<E> {}

/// Run `attempt` until it succeeds or the policy gives up.
///
/// `on_retry` is called once per failed attempt before sleeping, which is
/// where the firmware prints its progress dots. Returns the value and the
/// number of attempts it took.
pub fn retry_with<T, E, A, S, P>(
    policy: RetryPolicy,
    mut attempt: A,
    mut sleep: S,
    mut on_retry: P,
) -> Result<(T, u32), RetryExhausted<E>>
where
    A: FnMut() -> Result<T, E>,
    S: FnMut(Duration),
    P: FnMut(u32, &E),
{
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match attempt() {
            Ok(value) => return Ok((value, attempts)),
            Err(e) => match policy.delay_after(attempts) {
                Some(delay) => {
                    on_retry(attempts, &e);
                    sleep(delay);
                }
                None => {
                    return Err(RetryExhausted {
                        attempts,
                        last_error: e,
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forever_never_gives_up() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_bounded());
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_after(1_000_000), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_backoff_doubles_and_gives_up() {
        let policy = RetryPolicy::Backoff {
            initial_ms: 100,
            max_delay_ms: 1000,
            max_attempts: 5,
        };
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_after(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_after(4), Some(Duration::from_millis(800)));
        assert_eq!(policy.delay_after(5), None);
    }

    #[test]
    fn test_backoff_caps_delay() {
        let policy = RetryPolicy::Backoff {
            initial_ms: 100,
            max_delay_ms: 300,
            max_attempts: 100,
        };
        assert_eq!(policy.delay_after(3), Some(Duration::from_millis(300)));
        assert_eq!(policy.delay_after(64), Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_retry_with_counts_attempts() {
        let mut failures_left = 3;
        let mut slept = Vec::new();
        let mut dots = 0;
        let result = retry_with(
            RetryPolicy::default(),
            || {
                if failures_left > 0 {
                    failures_left -= 1;
                    Err("not associated")
                } else {
                    Ok("10.0.0.7")
                }
            },
            |d| slept.push(d),
            |_, _| dots += 1,
        );
        let (ip, attempts) = result.unwrap();
        assert_eq!(ip, "10.0.0.7");
        assert_eq!(attempts, 4);
        assert_eq!(dots, 3);
        assert_eq!(slept, vec![Duration::from_millis(500); 3]);
    }

    #[test]
    fn test_retry_with_exhausts_bounded_policy() {
        let policy = RetryPolicy::Backoff {
            initial_ms: 1,
            max_delay_ms: 4,
            max_attempts: 3,
        };
        let result: Result<((), u32), _> = retry_with(policy, || Err(7), |_| {}, |_, _| {});
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error, 7);
    }

    #[test]
    fn test_policy_serialization() {
        let policy = RetryPolicy::Backoff {
            initial_ms: 250,
            max_delay_ms: 8000,
            max_attempts: 20,
        };
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"kind\":\"backoff\""));
        let back: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
