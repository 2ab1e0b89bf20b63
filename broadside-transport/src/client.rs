//! Provider HTTP client and response classification.

use std::time::Duration;

use async_trait::async_trait;
use broadside_common::SendAttempt;
use thiserror::Error;

use crate::{OutboundMessage, RetrySchedule, retry::parse_retry_after};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Hard faults only: provider-side failures are reported through
/// [`SendOutcome`], never through this error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Provider configuration error: {0}")]
    Configuration(&'static str),

    #[error("Failed to construct HTTP client: {0}")]
    ClientBuild(String),
}

/// Classification of one provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// 2xx: the provider accepted the message.
    Accepted,
    /// 429 or 5xx: retry with backoff.
    Retryable,
    /// Any other status: fail immediately, no retry.
    Permanent,
}

impl Disposition {
    #[must_use]
    pub const fn classify(status: u16) -> Self {
        match status {
            200..=299 => Self::Accepted,
            429 | 500..=599 => Self::Retryable,
            _ => Self::Permanent,
        }
    }
}

/// Result of one logical send, after all retries.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub success: bool,
    /// Final response status, or `None` when every attempt failed at the
    /// network layer.
    pub status_code: Option<u16>,
    pub body: Option<String>,
    /// Attempts actually made.
    pub attempts: u32,
    pub history: Vec<SendAttempt>,
    pub error: Option<String>,
}

/// Sends one message to the external delivery provider.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Validate credentials before a bulk run issues any sends, so a
    /// configuration fault surfaces synchronously instead of per
    /// recipient.
    fn preflight(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, TransportError>;
}

/// HTTP transport against the provider's mail-send endpoint.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    schedule: RetrySchedule,
}

impl HttpTransport {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        schedule: RetrySchedule,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            schedule,
        })
    }

    async fn wait_before_retry(&self, attempt: u32, retry_after: Option<Duration>) {
        let wait = retry_after.unwrap_or_else(|| self.schedule.backoff(attempt));
        tracing::warn!(
            attempt,
            wait_secs = wait.as_secs_f64(),
            provider_hint = retry_after.is_some(),
            "Provider send attempt failed, backing off before retry"
        );
        tokio::time::sleep(wait).await;
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn preflight(&self) -> Result<(), TransportError> {
        if self.api_key.is_empty() {
            return Err(TransportError::Configuration(
                "provider API key is not configured",
            ));
        }
        Ok(())
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, TransportError> {
        self.preflight()?;

        let payload = message.provider_payload();
        let max_attempts = self.schedule.max_attempts;

        let mut history: Vec<SendAttempt> = Vec::new();
        let mut last_status: Option<u16> = None;
        let mut last_body: Option<String> = None;
        let mut last_error: Option<String> = None;

        for attempt in 1..=max_attempts {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retry_after = parse_retry_after(
                        response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok()),
                    );
                    let body = response.text().await.unwrap_or_default();

                    history.push(SendAttempt::responded(attempt, status));
                    last_status = Some(status);
                    last_body = Some(body.clone());

                    match Disposition::classify(status) {
                        Disposition::Accepted => {
                            tracing::debug!(to = %message.to, status, attempt, "Provider accepted message");
                            return Ok(SendOutcome {
                                success: true,
                                status_code: Some(status),
                                body: Some(body),
                                attempts: attempt,
                                history,
                                error: None,
                            });
                        }
                        Disposition::Retryable => {
                            last_error = Some(body);
                            if attempt < max_attempts {
                                self.wait_before_retry(attempt, retry_after).await;
                            }
                        }
                        Disposition::Permanent => {
                            tracing::error!(to = %message.to, status, "Provider rejected message permanently");
                            return Ok(SendOutcome {
                                success: false,
                                status_code: Some(status),
                                body: Some(body.clone()),
                                attempts: attempt,
                                history,
                                error: Some(body),
                            });
                        }
                    }
                }
                Err(e) => {
                    // Connection-level failures are transient: same backoff
                    // schedule as a retryable status.
                    let error = e.to_string();
                    history.push(SendAttempt::errored(attempt, error.clone()));
                    last_error = Some(error);
                    if attempt < max_attempts {
                        self.wait_before_retry(attempt, None).await;
                    }
                }
            }
        }

        Ok(SendOutcome {
            success: false,
            status_code: last_status,
            body: last_body,
            attempts: max_attempts,
            history,
            error: last_error.or_else(|| Some("max retries exceeded".to_string())),
        })
    }
}
