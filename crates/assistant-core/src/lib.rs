//! Core contract types for the Torque assistant pipeline.
//!
//! This crate provides the shared vocabulary for the query-routing and
//! response-assembly pipeline:
//!
//! - [`InferenceClient`] - The trait every inference backend must implement
//! - [`ChatRequest`] / [`ChatResponse`] - The inference endpoint contract
//! - [`ContentBlock`] / [`StopReason`] - Block-structured model output
//! - [`ContextBundle`] - Tagged per-slot context payloads
//! - [`ConversationWindow`] - Per-turn conversation history, passed by value
//! - [`InferenceError`] - Error taxonomy for inference operations
//!
//! # Example
//!
//! ```rust
//! use assistant_core::{ChatRequest, ChatResponse, ContentBlock, InferenceClient};
//! use assistant_core::{InferenceError, StopReason, TokenUsage};
//! use async_trait::async_trait;
//!
//! struct CannedClient;
//!
//! #[async_trait]
//! impl InferenceClient for CannedClient {
//!     async fn complete(&self, _request: ChatRequest) -> Result<ChatResponse, InferenceError> {
//!         Ok(ChatResponse {
//!             content: vec![ContentBlock::text("Hello!")],
//!             stop_reason: StopReason::EndTurn,
//!             usage: TokenUsage::default(),
//!         })
//!     }
//!
//!     fn name(&self) -> &str {
//!         "CannedClient"
//!     }
//! }
//! ```

mod chat;
mod client;
mod context;
mod error;
mod history;
mod prompt;

pub use chat::{
    ChatMessage, ChatRequest, ChatResponse, ContentBlock, Role, StopReason, TokenUsage,
    ToolDefinition,
};
pub use client::InferenceClient;
pub use context::{
    ContextBundle, FilteredContext, GarageStats, LocationInfo, SlotKey, SlotPayload, UserProfile,
    VehicleRef,
};
pub use error::InferenceError;
pub use history::{ConversationWindow, HistoryMessage};
pub use prompt::hash_prompt;

// Re-export async_trait for convenience
pub use async_trait::async_trait;
