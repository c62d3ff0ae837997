//! Bounded-retry interceptor.

use crate::interceptor::{Interceptor, Next, RpcCall};
use crate::policy::RetryPolicy;
use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use tonic::{Code, Status};
use tracing::{debug, warn};

/// Retries a call while it fails with a retryable code and attempts remain.
///
/// Every attempt runs under its own deadline of `per_attempt_timeout`. An
/// attempt that runs out of time fails with `DEADLINE_EXCEEDED` and is
/// retried like a transient failure. The final error is returned unchanged.
#[derive(Debug, Clone)]
pub struct RetryInterceptor {
    policy: RetryPolicy,
}

impl RetryInterceptor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn should_retry(&self, status: &Status, timed_out: bool) -> bool {
        timed_out || status.code() == Code::DeadlineExceeded || self.policy.is_retryable(status.code())
    }
}

#[async_trait]
impl Interceptor for RetryInterceptor {
    async fn intercept(&self, call: RpcCall, next: Next<'_>) -> Result<Bytes, Status> {
        let max_attempts = self.policy.max_attempts();
        let timeout = self.policy.per_attempt_timeout();
        let mut attempt = 0;

        loop {
            attempt += 1;
            counter!("rpc_client_attempts_total", "method" => call.method).increment(1);

            let mut attempt_call = call.clone();
            attempt_call.timeout = Some(timeout);

            let (result, timed_out) = match tokio::time::timeout(timeout, next.run(attempt_call)).await {
                Ok(result) => (result, false),
                Err(_) => (
                    Err(Status::deadline_exceeded(format!(
                        "attempt {} exceeded {:?}",
                        attempt, timeout
                    ))),
                    true,
                ),
            };

            let status = match result {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(method = call.method, attempt, "call succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(status) => status,
            };

            if attempt >= max_attempts || !self.should_retry(&status, timed_out) {
                return Err(status);
            }

            warn!(
                method = call.method,
                attempt,
                max_attempts,
                code = ?status.code(),
                "retrying call: {}",
                status.message()
            );
            counter!("rpc_client_retries_total", "method" => call.method).increment(1);

            let backoff = self.policy.backoff();
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
