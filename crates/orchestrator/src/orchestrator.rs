//! The public pipeline entry point.
//!
//! One call per user turn: classify, filter context, run the specialist,
//! validate, format (or stream), and always hand back prose. Hard
//! failures anywhere in the primary path escalate to the recovery
//! executor, whose terminal static fallback cannot fail - raw errors,
//! stack traces, and internal markup never reach the caller.

use std::sync::Arc;
use std::time::Duration;

use assistant_core::{ContextBundle, ConversationWindow, InferenceClient, InferenceError};
use assistant_tools::{InvokerPolicy, TimeoutClass, ToolInvoker, ToolRegistry};
use inference_client::{HttpInferenceClient, InferenceConfig};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::classifier::IntentClassifier;
use crate::context_filter::{ContextFilter, FilterOutcome};
use crate::error::OrchestratorError;
use crate::formatter::{clean, OutputFormatter};
use crate::recovery::RecoveryExecutor;
use crate::specialist::{SpecialistExecutor, SpecialistSet, UsageReport};
use crate::stream::StreamFormatter;
use crate::validator::validate;

/// Chunk size used when replaying a response through a streaming session.
const STREAM_CHUNK_BYTES: usize = 64;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Model for specialist execution.
    pub default_model: String,
    /// Model for classification and formatting passes.
    pub fast_model: String,
    /// Max tokens per specialist response.
    pub max_tokens: u32,
    /// Wall-clock budget for one specialist execution.
    pub turn_deadline: Duration,
    /// History turns shown to the LLM classification tier.
    pub classifier_history_turns: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_model: "torque-large".to_string(),
            fast_model: "torque-fast".to_string(),
            max_tokens: 2048,
            turn_deadline: Duration::from_secs(120),
            classifier_history_turns: 6,
        }
    }
}

impl OrchestratorConfig {
    /// Derive pipeline configuration from an inference configuration.
    pub fn from_inference(config: &InferenceConfig) -> Self {
        Self {
            default_model: config.default_model.clone(),
            fast_model: config.fast_model.clone(),
            max_tokens: config.max_tokens,
            ..Self::default()
        }
    }
}

/// One user turn, as handed in by the surrounding application.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub message: String,
    pub history: ConversationWindow,
    pub context: ContextBundle,
    /// Whether the turn carries an image attachment.
    pub has_image: bool,
}

impl TurnRequest {
    /// A plain text turn with no history or context.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// What a turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Final user-facing text. Never empty.
    pub text: String,
    /// Token usage and cost for the turn's specialist execution.
    pub usage: UsageReport,
    /// Which specialist answered ("parts", "recovery", ...).
    pub agent_id: String,
    /// Capability names invoked during the turn, in order.
    pub tool_calls_used: Vec<String>,
}

/// Intermediate product of the pipeline before presentation.
struct AssembledTurn {
    /// Validated content; may still contain internal markup.
    content: String,
    usage: UsageReport,
    agent_id: String,
    tool_calls_used: Vec<String>,
}

/// The pipeline root.
pub struct Orchestrator {
    classifier: IntentClassifier,
    filter: ContextFilter,
    executor: Arc<SpecialistExecutor>,
    specialists: Arc<SpecialistSet>,
    formatter: OutputFormatter,
    recovery: RecoveryExecutor,
    turn_deadline: Duration,
}

impl Orchestrator {
    /// Create a pipeline over the given inference client and invoker.
    pub fn new(
        client: Arc<dyn InferenceClient>,
        invoker: Arc<ToolInvoker>,
        config: OrchestratorConfig,
    ) -> Self {
        let specialists = Arc::new(SpecialistSet::default_set());
        let executor = Arc::new(SpecialistExecutor::new(
            client.clone(),
            invoker,
            config.default_model.clone(),
            config.max_tokens,
        ));
        let recovery = RecoveryExecutor::new(executor.clone(), specialists.clone());

        Self {
            classifier: IntentClassifier::new(client.clone(), config.fast_model.clone())
                .with_history_turns(config.classifier_history_turns),
            filter: ContextFilter::new(),
            executor,
            specialists,
            formatter: OutputFormatter::new(client, config.fast_model),
            recovery,
            turn_deadline: config.turn_deadline,
        }
    }

    /// Create a pipeline from environment variables and a capability
    /// registry, using the production invoker policy.
    pub fn from_env(registry: Arc<ToolRegistry>) -> Result<Self, InferenceError> {
        let config = InferenceConfig::from_env()?;
        let client = Arc::new(HttpInferenceClient::new(config.clone())?);
        let invoker = Arc::new(ToolInvoker::with_policy(
            registry,
            Self::default_invoker_policy(),
        ));
        Ok(Self::new(
            client,
            invoker,
            OrchestratorConfig::from_inference(&config),
        ))
    }

    /// The production timeout classes: marketplace and analysis
    /// capabilities call out to secondary services and get the extended
    /// budget.
    pub fn default_invoker_policy() -> InvokerPolicy {
        InvokerPolicy::default()
            .with_timeout_class("listing_search", TimeoutClass::Extended)
            .with_timeout_class("market_analysis", TimeoutClass::Extended)
    }

    /// Process one turn and return the final response synchronously.
    pub async fn handle_turn(&self, request: TurnRequest) -> TurnOutcome {
        let assembled = self.assemble(&request).await;
        let mut text = self.formatter.format(&assembled.content).await;

        if text.trim().is_empty() {
            // Validator and formatter both failed to produce anything
            // usable; this is a recovery condition of its own.
            warn!("formatted output empty, escalating to recovery");
            text = self
                .recovery
                .recover(
                    &request.message,
                    &request.history,
                    &Default::default(),
                    crate::intent::Intent::General,
                )
                .await;
        }

        TurnOutcome {
            text,
            usage: assembled.usage,
            agent_id: assembled.agent_id,
            tool_calls_used: assembled.tool_calls_used,
        }
    }

    /// Process one turn, delivering text incrementally through `tx`.
    ///
    /// Cleaned chunks arrive on the channel as the streaming session
    /// processes them; dropping the receiver cancels emission. The
    /// returned outcome carries the assembled text as well.
    pub async fn handle_turn_streaming(
        &self,
        request: TurnRequest,
        tx: mpsc::Sender<String>,
    ) -> TurnOutcome {
        let assembled = self.assemble(&request).await;

        let mut session = StreamFormatter::new(tx);
        for chunk in chunk_at_boundaries(&assembled.content, STREAM_CHUNK_BYTES) {
            session.feed(chunk).await;
        }
        session.flush().await;

        TurnOutcome {
            text: clean(&assembled.content),
            usage: assembled.usage,
            agent_id: assembled.agent_id,
            tool_calls_used: assembled.tool_calls_used,
        }
    }

    /// Classify, filter, execute, validate; escalate on hard failure.
    async fn assemble(&self, request: &TurnRequest) -> AssembledTurn {
        let classification = self
            .classifier
            .classify(
                &request.message,
                &request.history,
                &request.context,
                request.has_image,
            )
            .await;

        info!(
            intent = classification.intent.as_str(),
            confidence = classification.confidence,
            used_llm = classification.used_llm,
            reasoning = %classification.reasoning,
            "turn classified"
        );

        let FilterOutcome { context, trace } =
            self.filter
                .filter(classification.intent, &request.message, &request.context);
        debug!(filter = %trace.summary(), "context filtered");

        let specialist = self.specialists.for_intent(classification.intent);

        let executed = timeout(
            self.turn_deadline,
            self.executor.execute(
                &request.message,
                request.has_image,
                &request.history,
                &context,
                specialist,
            ),
        )
        .await;

        match executed {
            Ok(Ok(result)) => {
                let validation = validate(&result.raw_text, &result.tool_calls_used);
                if validation.used_fallback {
                    // Quality telemetry, distinct from hard errors.
                    info!(
                        issue = ?validation.issue,
                        specialist = specialist.id,
                        "validator substituted fallback content"
                    );
                }
                AssembledTurn {
                    content: validation.content,
                    usage: result.usage,
                    agent_id: specialist.id.to_string(),
                    tool_calls_used: result.tool_calls_used,
                }
            }
            Ok(Err(err)) => {
                error!(error = %err, specialist = specialist.id, "specialist execution failed");
                self.recovered_turn(request, &context, classification.intent)
                    .await
            }
            Err(_) => {
                let err = OrchestratorError::DeadlineExceeded(self.turn_deadline.as_secs());
                error!(error = %err, specialist = specialist.id, "turn deadline exceeded");
                self.recovered_turn(request, &context, classification.intent)
                    .await
            }
        }
    }

    async fn recovered_turn(
        &self,
        request: &TurnRequest,
        context: &assistant_core::FilteredContext,
        intent: crate::intent::Intent,
    ) -> AssembledTurn {
        let text = self
            .recovery
            .recover(&request.message, &request.history, context, intent)
            .await;
        AssembledTurn {
            content: text,
            usage: UsageReport::default(),
            agent_id: "recovery".to_string(),
            tool_calls_used: Vec::new(),
        }
    }
}

/// Split text into chunks of roughly `size` bytes on char boundaries.
fn chunk_at_boundaries(text: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let mut cut = size.min(rest.len());
        while !rest.is_char_boundary(cut) {
            cut += 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks
}
