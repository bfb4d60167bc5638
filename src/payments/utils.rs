use crate::payments::error::{PaymentError, PaymentResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::warn;

/// Authentication scheme for an outbound provider call. PayHero uses HTTP
/// Basic credentials, UmsPay a bearer API key.
#[derive(Debug, Clone, Copy)]
pub enum AuthScheme<'a> {
    Basic {
        username: &'a str,
        password: &'a str,
    },
    Bearer(&'a str),
}

/// Thin reqwest wrapper shared by both providers.
///
/// Retries are reserved for transient transport failures (connect errors,
/// timeouts, 5xx) with a fixed backoff; a structured 4xx business
/// rejection surfaces immediately.
#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration, max_retries: u32) -> PaymentResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PaymentError::NetworkError {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        Ok(Self {
            client,
            timeout,
            max_retries,
            retry_delay: Duration::from_millis(500),
        })
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        auth: AuthScheme<'_>,
        body: Option<&JsonValue>,
    ) -> PaymentResult<T> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            let mut request = self.client.request(method.clone(), url);
            request = request.timeout(self.timeout);

            request = match auth {
                AuthScheme::Basic { username, password } => {
                    request.basic_auth(username, Some(password))
                }
                AuthScheme::Bearer(token) => request.bearer_auth(token),
            };
            if let Some(payload) = body {
                request = request.json(payload);
            }

            let response = request
                .send()
                .await
                .map_err(|e| PaymentError::NetworkError {
                    message: format!("provider request failed: {}", e),
                });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_success() {
                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            PaymentError::ProviderError {
                                provider: "http".to_string(),
                                message: format!("invalid provider JSON response: {}", e),
                                provider_code: None,
                                retryable: false,
                            }
                        });
                    }

                    if status.is_server_error() && attempt < self.max_retries {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "provider server error, retrying"
                        );
                        tokio::time::sleep(self.retry_delay).await;
                        continue;
                    }

                    // 4xx with a structured error body is a business
                    // rejection, never retried.
                    return Err(PaymentError::ProviderError {
                        provider: "http".to_string(),
                        message: format!("HTTP {}: {}", status, text),
                        provider_code: Some(status.as_u16().to_string()),
                        retryable: status.is_server_error(),
                    });
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        "provider request failed, retrying"
                    );
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(PaymentError::NetworkError {
            message: "provider request failed".to_string(),
        }))
    }
}

/// Shared success-classification rule, identical for both providers:
/// `Success` only when the explicit indicator is true AND the status
/// string equals the provider's completed token case-insensitively.
/// A present-but-wrong combination is `Failed`; a shapeless payload is
/// `Unknown`.
pub fn classify_outcome(
    indicator: Option<bool>,
    status: Option<&str>,
    completed_token: &str,
) -> crate::payments::types::CallbackOutcome {
    use crate::payments::types::CallbackOutcome;

    match (indicator, status) {
        (Some(true), Some(s)) if s.eq_ignore_ascii_case(completed_token) => {
            CallbackOutcome::Success
        }
        (None, None) => CallbackOutcome::Unknown,
        _ => CallbackOutcome::Failed,
    }
}
