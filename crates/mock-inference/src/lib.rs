//! Scripted inference clients for testing the Torque pipeline.
//!
//! Three test doubles for `assistant_core::InferenceClient`:
//!
//! - [`ScriptedInference`] - Pops pre-queued responses and records every
//!   request it receives, for asserting on what the pipeline sent.
//! - [`FailingInference`] - Always fails with a configurable error.
//! - [`DelayedInference`] - Wraps another client and adds artificial
//!   latency, for timeout and deadline tests.

mod delayed;
mod failing;
mod scripted;

pub use delayed::DelayedInference;
pub use failing::{FailingInference, FailureKind};
pub use scripted::{text_response, tool_use_response, ScriptedInference};
