//! Resilient request client.
//!
//! Wraps a [`Transport`] with bounded retries and exponential backoff.
//! Transport failures and 429 responses are retried; any other non-success
//! status ends the call immediately.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{parse_api_error, ClientError};
use crate::retry::RetryPolicy;
use crate::transport::{HttpRequest, HttpResponse, Transport};

const STATUS_TOO_MANY_REQUESTS: u16 = 429;

pub struct ResilientClient<T: Transport + ?Sized> {
    transport: Arc<T>,
    policy: RetryPolicy,
}

impl<T: Transport + ?Sized> Clone for ResilientClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policy: self.policy,
        }
    }
}

impl<T: Transport + ?Sized> ResilientClient<T> {
    pub fn new(transport: Arc<T>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Perform `request`, retrying transient failures per the policy.
    ///
    /// Attempts run strictly one after another. The first 2xx response is
    /// returned as-is; the caller decodes the body.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let request_id = Uuid::new_v4().to_string();
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let err = match self.transport.send(request).await {
                Ok(response) if response.is_success() => {
                    info!(
                        request_id = %request_id,
                        attempt,
                        status = response.status,
                        "Request succeeded"
                    );
                    return Ok(response);
                }
                Ok(response) if response.status == STATUS_TOO_MANY_REQUESTS => {
                    ClientError::RateLimited { attempts: attempt }
                }
                Ok(response) => parse_api_error(response.status, &response.body),
                Err(e) => ClientError::TransportFailure(e.0),
            };

            if !err.is_retryable() {
                error!(
                    request_id = %request_id,
                    attempt,
                    status = err.status(),
                    error = %err,
                    "Request failed with non-retryable status"
                );
                return Err(err);
            }

            let Some(delay) = self.policy.delay_for_retry(attempt) else {
                error!(
                    request_id = %request_id,
                    attempts = attempt,
                    max_attempts,
                    error = %err,
                    "Request failed, retries exhausted"
                );
                return Err(err);
            };

            warn!(
                request_id = %request_id,
                attempt,
                code = err.code(),
                error = %err,
                "Retrying in {:?}...",
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
