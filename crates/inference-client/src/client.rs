//! HTTP implementation of the InferenceClient trait.

use std::sync::Arc;

use assistant_core::{async_trait, ChatRequest, ChatResponse, InferenceClient, InferenceError};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::breaker::CircuitBreaker;
use crate::config::InferenceConfig;

/// Error envelope returned by the inference endpoint.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetails {
    message: String,
}

/// Production inference client over HTTP.
///
/// Every call is gated by the shared circuit breaker: while the breaker is
/// open, `complete` fails fast with [`InferenceError::Unavailable`] and no
/// request leaves the process.
pub struct HttpInferenceClient {
    client: Client,
    config: InferenceConfig,
    breaker: Arc<CircuitBreaker>,
}

impl HttpInferenceClient {
    /// Create a client with its own breaker, sized from the config.
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let breaker = Arc::new(CircuitBreaker::new(
            config.breaker_threshold,
            config.breaker_cooldown,
        ));
        Self::with_breaker(config, breaker)
    }

    /// Create a client sharing an existing breaker.
    ///
    /// The breaker state is process-wide by design; when several clients
    /// target the same endpoint they must share one breaker.
    pub fn with_breaker(
        config: InferenceConfig,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                InferenceError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            breaker,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self, InferenceError> {
        Self::new(InferenceConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Get the shared circuit breaker.
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        self.breaker.clone()
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, InferenceError> {
        let url = format!("{}/v1/messages", self.config.api_url);

        debug!(model = %request.model, messages = request.messages.len(), "sending inference request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| InferenceError::Network(format!("failed to send request: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| InferenceError::Parse(format!("failed to parse response: {}", e)))
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        self.breaker.check()?;

        match self.send(&request).await {
            Ok(response) => {
                self.breaker.record_success();
                debug!(
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    stop_reason = ?response.stop_reason,
                    "inference request complete"
                );
                Ok(response)
            }
            Err(error) => {
                if error.counts_as_outage() {
                    self.breaker.record_failure();
                } else {
                    // A malformed request is our bug; the provider is healthy.
                    self.breaker.record_success();
                }
                warn!(error = %error, "inference request failed");
                Err(error)
            }
        }
    }

    fn name(&self) -> &str {
        "HttpInferenceClient"
    }
}
