//! Query routing and response assembly pipeline for the Torque assistant.
//!
//! This crate is the conversational core of the product: it decides what
//! kind of help a message is asking for, controls what context gets spent
//! on the request, runs the right specialist with bounded tool use, and
//! guarantees the user never sees malformed, empty, or internal-only
//! output.
//!
//! # Architecture
//!
//! ```text
//! user message + history + raw context
//!          |
//! +--------v---------------------------------------------------+
//! |                       ORCHESTRATOR                         |
//! |                                                            |
//! |  1. Classify      pattern rules, then LLM only if needed   |
//! |         |                                                  |
//! |  2. Filter        intent x slot relevance matrix + boosts  |
//! |         |                                                  |
//! |  3. Execute       specialist tool loop (bounded, timed)    |
//! |         |                                                  |
//! |  4. Validate      emptiness / internal-markup checks       |
//! |         |                                                  |
//! |  5. Format        cleanup, optional fast-model rewrite,    |
//! |         |         or the streaming session                 |
//! |         v                                                  |
//! |  final text + usage        (recovery executor on failure)  |
//! +------------------------------------------------------------+
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use orchestrator::{Orchestrator, TurnRequest};
//! use assistant_tools::ToolRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(ToolRegistry::new());
//!     let orchestrator = Orchestrator::from_env(registry)?;
//!
//!     let outcome = orchestrator
//!         .handle_turn(TurnRequest::text("Stage 1 tune options for my GTI?"))
//!         .await;
//!
//!     println!("[{}] {}", outcome.agent_id, outcome.text);
//!     Ok(())
//! }
//! ```

mod classifier;
mod context_filter;
mod error;
mod formatter;
mod intent;
mod markup;
mod orchestrator;
mod patterns;
mod recovery;
mod specialist;
mod stream;
mod validator;

// Public exports
pub use classifier::{
    IntentClassifier, CLASSIFIER_SYSTEM_PROMPT, DEFAULT_CLASSIFIER_HISTORY_TURNS,
    PATTERN_CONFIDENCE_THRESHOLD,
};
pub use context_filter::{ContextFilter, Disposition, FilterOutcome, FilterTrace, SlotDecision};
pub use error::OrchestratorError;
pub use formatter::{clean, looks_clean, OutputFormatter, FORMATTER_SYSTEM_PROMPT};
pub use intent::{ClassificationResult, Intent};
pub use markup::{strip_internal_blocks, INTERNAL_CLOSE, INTERNAL_OPEN};
pub use orchestrator::{Orchestrator, OrchestratorConfig, TurnOutcome, TurnRequest};
pub use patterns::{PatternClassifier, PatternMatch};
pub use recovery::{static_fallback, RecoveryExecutor, RECOVERY_SYSTEM_PROMPT};
pub use specialist::{
    AgentExecutionResult, Specialist, SpecialistExecutor, SpecialistSet, ToolTiming, UsageReport,
    DEFAULT_MAX_ITERATIONS,
};
pub use stream::{StreamFormatter, STREAM_BUFFER_THRESHOLD};
pub use validator::{validate, ValidationIssue, ValidationOutcome, MIN_CONTENT_LENGTH};

// Re-export commonly used types from dependencies
pub use assistant_core::{ContextBundle, ConversationWindow, HistoryMessage, InferenceClient};
pub use assistant_tools::{ToolInvoker, ToolRegistry};
