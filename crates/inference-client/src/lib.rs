//! HTTP inference endpoint client with circuit breaker protection.
//!
//! This crate provides [`HttpInferenceClient`], the production
//! implementation of `assistant_core::InferenceClient`. All calls pass
//! through a process-wide [`CircuitBreaker`]: a sustained failure rate
//! against the endpoint trips the breaker and causes immediate fast
//! failure until a cool-down elapses, instead of queueing requests behind
//! a struggling provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use inference_client::{HttpInferenceClient, InferenceConfig};
//! use assistant_core::{ChatMessage, ChatRequest, InferenceClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = InferenceConfig::from_env()?;
//!     let client = HttpInferenceClient::new(config)?;
//!
//!     let request = ChatRequest {
//!         model: client.config().default_model.clone(),
//!         max_tokens: 1024,
//!         system: None,
//!         messages: vec![ChatMessage::user("Best first mod for a GR86?")],
//!         tools: Vec::new(),
//!     };
//!
//!     let response = client.complete(request).await?;
//!     println!("{}", response.text());
//!     Ok(())
//! }
//! ```

mod breaker;
mod client;
mod config;
mod pricing;

pub use breaker::{BreakerState, CircuitBreaker};
pub use client::HttpInferenceClient;
pub use config::InferenceConfig;
pub use pricing::cost_cents;
