//! Configuration for the HTTP inference client.

use std::env;
use std::time::Duration;

use assistant_core::InferenceError;

/// Configuration for [`crate::HttpInferenceClient`].
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Inference endpoint base URL.
    pub api_url: String,

    /// API key for authentication.
    pub api_key: String,

    /// Default model for specialist execution.
    pub default_model: String,

    /// Fast, cheap model for classification and formatting passes.
    pub fast_model: String,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,

    /// Consecutive failures before the circuit breaker opens.
    pub breaker_threshold: u32,

    /// Cool-down before an open breaker allows a probe request.
    pub breaker_cooldown: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.inference.torque.internal".to_string(),
            api_key: String::new(),
            default_model: "torque-large".to_string(),
            fast_model: "torque-fast".to_string(),
            max_tokens: 2048,
            request_timeout: Duration::from_secs(60),
            breaker_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
        }
    }
}

impl InferenceConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `TORQUE_API_KEY` - API key for authentication
    ///
    /// Optional environment variables:
    /// - `TORQUE_API_URL` - Endpoint base URL
    /// - `TORQUE_MODEL` - Default model (default: torque-large)
    /// - `TORQUE_FAST_MODEL` - Fast model (default: torque-fast)
    /// - `TORQUE_MAX_TOKENS` - Max tokens per response (default: 2048)
    /// - `TORQUE_REQUEST_TIMEOUT_SECS` - HTTP timeout (default: 60)
    /// - `TORQUE_BREAKER_THRESHOLD` - Failures before the breaker opens (default: 5)
    /// - `TORQUE_BREAKER_COOLDOWN_SECS` - Breaker cool-down (default: 30)
    pub fn from_env() -> Result<Self, InferenceError> {
        let defaults = Self::default();

        let api_key = env::var("TORQUE_API_KEY")
            .map_err(|_| InferenceError::Configuration("TORQUE_API_KEY not set".to_string()))?;

        let api_url = env::var("TORQUE_API_URL").unwrap_or(defaults.api_url);
        let default_model = env::var("TORQUE_MODEL").unwrap_or(defaults.default_model);
        let fast_model = env::var("TORQUE_FAST_MODEL").unwrap_or(defaults.fast_model);

        let max_tokens = env::var("TORQUE_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_tokens);

        let request_timeout = env::var("TORQUE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let breaker_threshold = env::var("TORQUE_BREAKER_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.breaker_threshold);

        let breaker_cooldown = env::var("TORQUE_BREAKER_COOLDOWN_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.breaker_cooldown);

        Ok(Self {
            api_url,
            api_key,
            default_model,
            fast_model,
            max_tokens,
            request_timeout,
            breaker_threshold,
            breaker_cooldown,
        })
    }

    /// Create a new config builder.
    pub fn builder() -> InferenceConfigBuilder {
        InferenceConfigBuilder::default()
    }
}

/// Builder for [`InferenceConfig`].
#[derive(Debug, Default)]
pub struct InferenceConfigBuilder {
    config: InferenceConfig,
}

impl InferenceConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Set the endpoint base URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the default model.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    /// Set the fast model.
    pub fn fast_model(mut self, model: impl Into<String>) -> Self {
        self.config.fast_model = model.into();
        self
    }

    /// Set the max tokens per response.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = tokens;
        self
    }

    /// Set the per-request HTTP timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the breaker failure threshold.
    pub fn breaker_threshold(mut self, threshold: u32) -> Self {
        self.config.breaker_threshold = threshold;
        self
    }

    /// Set the breaker cool-down.
    pub fn breaker_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.breaker_cooldown = cooldown;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> InferenceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();

        assert!(config.api_key.is_empty());
        assert_eq!(config.default_model, "torque-large");
        assert_eq!(config.fast_model, "torque-fast");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.breaker_threshold, 5);
        assert_eq!(config.breaker_cooldown, Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let config = InferenceConfig::builder()
            .api_key("test-key")
            .api_url("https://inference.test")
            .default_model("torque-xl")
            .fast_model("torque-mini")
            .max_tokens(512)
            .request_timeout(Duration::from_secs(10))
            .breaker_threshold(2)
            .breaker_cooldown(Duration::from_secs(5))
            .build();

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.api_url, "https://inference.test");
        assert_eq!(config.default_model, "torque-xl");
        assert_eq!(config.fast_model, "torque-mini");
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.breaker_threshold, 2);
        assert_eq!(config.breaker_cooldown, Duration::from_secs(5));
    }

    // Environment-based tests are combined into a single test to avoid
    // race conditions when tests run in parallel (env vars are process-global).
    #[test]
    fn test_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        fn clear_all_torque_vars() {
            std::env::remove_var("TORQUE_API_KEY");
            std::env::remove_var("TORQUE_API_URL");
            std::env::remove_var("TORQUE_MODEL");
            std::env::remove_var("TORQUE_FAST_MODEL");
            std::env::remove_var("TORQUE_MAX_TOKENS");
            std::env::remove_var("TORQUE_REQUEST_TIMEOUT_SECS");
            std::env::remove_var("TORQUE_BREAKER_THRESHOLD");
            std::env::remove_var("TORQUE_BREAKER_COOLDOWN_SECS");
        }

        // Missing API key should error
        clear_all_torque_vars();
        let result = InferenceConfig::from_env();
        match result {
            Err(InferenceError::Configuration(msg)) => assert!(msg.contains("TORQUE_API_KEY")),
            other => panic!("Expected Configuration error, got {:?}", other.map(|_| ())),
        }

        // Only API key set, defaults used
        clear_all_torque_vars();
        std::env::set_var("TORQUE_API_KEY", "env-key");
        let config = InferenceConfig::from_env().unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.default_model, "torque-large");
        assert_eq!(config.max_tokens, 2048);

        // All vars set
        std::env::set_var("TORQUE_API_URL", "https://env.test");
        std::env::set_var("TORQUE_MODEL", "torque-xl");
        std::env::set_var("TORQUE_FAST_MODEL", "torque-mini");
        std::env::set_var("TORQUE_MAX_TOKENS", "4096");
        std::env::set_var("TORQUE_REQUEST_TIMEOUT_SECS", "15");
        std::env::set_var("TORQUE_BREAKER_THRESHOLD", "3");
        std::env::set_var("TORQUE_BREAKER_COOLDOWN_SECS", "60");

        let config = InferenceConfig::from_env().unwrap();
        assert_eq!(config.api_url, "https://env.test");
        assert_eq!(config.default_model, "torque-xl");
        assert_eq!(config.fast_model, "torque-mini");
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.breaker_threshold, 3);
        assert_eq!(config.breaker_cooldown, Duration::from_secs(60));

        clear_all_torque_vars();
    }
}
