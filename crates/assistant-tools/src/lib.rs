//! Capability contract, registry, and bounded invoker for the Torque assistant.
//!
//! Capabilities are external, named operations (parts search, vehicle
//! specs, listing search) that a specialist may invoke mid-generation.
//! This crate owns the contract each capability must satisfy to be
//! orchestrated safely; the implementations themselves live in other
//! services.
//!
//! # Architecture
//!
//! - [`Tool`] - The capability trait: name, description, declared input
//!   schema, async execution.
//! - [`ToolRegistry`] - Name-based dispatch plus tool declarations for a
//!   specialist's allowed subset.
//! - [`ToolInvoker`] - The only execution path the pipeline uses: races
//!   each call against its timeout class (15s standard, 45s for
//!   capabilities that reach secondary services), translates every
//!   failure into a structured payload, and never returns an error.
//! - [`ResultCache`] - Explicit, constructor-injected result cache with
//!   invalidation hooks.
//! - [`HttpCapability`] - Adapter exposing a remote capability through
//!   the contract.
//!
//! # Example
//!
//! ```rust,ignore
//! use assistant_tools::{HttpCapability, InvokerPolicy, TimeoutClass, ToolCall, ToolInvoker, ToolRegistry};
//! use std::sync::Arc;
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(HttpCapability::new(
//!     "listing_search",
//!     "Search live marketplace listings",
//!     serde_json::json!({"type": "object"}),
//!     "https://capabilities.internal/listing_search",
//! ));
//!
//! let policy = InvokerPolicy::default()
//!     .with_timeout_class("listing_search", TimeoutClass::Extended);
//! let invoker = ToolInvoker::with_policy(Arc::new(registry), policy);
//! ```

mod error;
mod http_capability;
mod invoker;
mod registry;
mod tool;

pub use error::ToolError;
pub use http_capability::HttpCapability;
pub use invoker::{
    InvokerPolicy, ResultCache, TimeoutClass, ToolCall, ToolInvocation, ToolInvoker,
};
pub use registry::ToolRegistry;
pub use tool::{InvocationContext, Tool, ToolArgs, ToolOutput};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
