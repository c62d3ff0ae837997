//! Retry policy attached to a channel.

use std::time::Duration;
use tonic::Code;

/// Default number of attempts per call, first attempt included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default deadline for a single attempt.
pub const DEFAULT_PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default linear delay between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(50);

/// Immutable retry configuration shared by every call on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    retryable_codes: Vec<Code>,
    max_attempts: u32,
    per_attempt_timeout: Duration,
    backoff: Duration,
}

impl RetryPolicy {
    /// Policy that retries `UNAVAILABLE` only.
    pub fn new(max_attempts: u32, per_attempt_timeout: Duration) -> Self {
        Self {
            retryable_codes: vec![Code::Unavailable],
            max_attempts,
            per_attempt_timeout,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Replace the set of codes that trigger a retry.
    pub fn with_codes(mut self, codes: impl IntoIterator<Item = Code>) -> Self {
        self.retryable_codes = codes.into_iter().collect();
        self
    }

    /// Set the delay slept between attempts.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total attempts per call. A configured value of zero still makes one attempt.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn per_attempt_timeout(&self) -> Duration {
        self.per_attempt_timeout
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn retryable_codes(&self) -> &[Code] {
        &self.retryable_codes
    }

    /// Whether a failure with this code may be attempted again.
    pub fn is_retryable(&self, code: Code) -> bool {
        self.retryable_codes.contains(&code)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_PER_ATTEMPT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retries_unavailable_only() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(Code::Unavailable));
        assert!(!policy.is_retryable(Code::InvalidArgument));
        assert!(!policy.is_retryable(Code::NotFound));
        assert!(!policy.is_retryable(Code::PermissionDenied));
        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_zero_attempts_still_calls_once() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_custom_codes() {
        let policy = RetryPolicy::default().with_codes([Code::ResourceExhausted]);
        assert!(policy.is_retryable(Code::ResourceExhausted));
        assert!(!policy.is_retryable(Code::Unavailable));
    }
}
