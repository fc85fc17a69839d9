//! Specialist configurations and the bounded generate/tool/generate loop.
//!
//! A specialist is a configuration bundle: system prompt, allowed tool
//! subset, model choice, and iteration budget. The executor drives the
//! inference endpoint in a loop, invoking requested capabilities between
//! rounds, until the model stops asking for tools or the budget runs out.

use std::sync::Arc;
use std::time::Instant;

use assistant_core::{
    ChatMessage, ChatRequest, ContentBlock, ConversationWindow, FilteredContext, InferenceClient,
    TokenUsage,
};
use assistant_tools::{InvocationContext, ToolCall, ToolInvoker};
use inference_client::cost_cents;
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;
use crate::intent::Intent;

/// Default bound on generate/tool/generate iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Marker appended to the user message when the turn carries an image.
const IMAGE_MARKER: &str = "[image attached]";

/// A specialist: one intent family's prompt, tools, and model choice.
#[derive(Debug, Clone)]
pub struct Specialist {
    /// Stable identifier, surfaced in turn outcomes.
    pub id: &'static str,
    /// System prompt for this specialist role.
    pub system_prompt: String,
    /// Capability names this specialist may invoke.
    pub allowed_tools: Vec<String>,
    /// Model override; `None` uses the executor's default model.
    pub model: Option<String>,
    /// Iteration budget for the tool loop.
    pub max_iterations: usize,
}

impl Specialist {
    fn new(id: &'static str, system_prompt: &str, allowed_tools: &[&str]) -> Self {
        Self {
            id,
            system_prompt: system_prompt.to_string(),
            allowed_tools: allowed_tools.iter().map(|s| s.to_string()).collect(),
            model: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// The full set of specialists, keyed by intent.
pub struct SpecialistSet {
    parts: Specialist,
    build: Specialist,
    shopping: Specialist,
    specs: Specialist,
    maintenance: Specialist,
    vision: Specialist,
    clarify: Specialist,
    general: Specialist,
    recovery: Specialist,
}

impl SpecialistSet {
    /// The production specialist set.
    pub fn default_set() -> Self {
        Self {
            parts: Specialist::new(
                "parts",
                "You are a performance parts advisor for car enthusiasts. \
                 Recommend concrete parts with realistic gains and note supporting \
                 mods a setup needs. Use the parts catalog before quoting fitment.",
                &["part_search", "vehicle_specs"],
            ),
            build: Specialist::new(
                "build",
                "You are a project build planner. Lay out build stages in order, \
                 with rough budget per stage, and call out prerequisites like \
                 fueling or cooling before power mods.",
                &["build_guides", "part_search", "vehicle_specs"],
            ),
            shopping: Specialist::new(
                "shopping",
                "You are a car shopping advisor. Match cars to the user's budget \
                 and needs, mention known weak points of each pick, and check \
                 live listings when asked about availability.",
                &["listing_search", "market_analysis", "vehicle_specs"],
            ),
            specs: Specialist::new(
                "specs",
                "You answer vehicle specification questions precisely. Look up \
                 exact figures rather than estimating, and say which trim a \
                 figure applies to.",
                &["vehicle_specs"],
            ),
            maintenance: Specialist::new(
                "maintenance",
                "You are a diagnostics and maintenance advisor. Work from \
                 symptoms to likely causes, cheapest checks first, and flag \
                 anything that is unsafe to drive on.",
                &["repair_guides", "vehicle_specs"],
            ),
            vision: Specialist::new(
                "vision",
                "You identify vehicles and parts from photos and answer \
                 questions about what is pictured.",
                &["vehicle_specs", "part_search"],
            ),
            clarify: Specialist::new(
                "clarify",
                "The user's message was too ambiguous to act on. Ask one short, \
                 friendly clarifying question that helps them say what they need. \
                 Offer two or three concrete directions they might mean.",
                &[],
            ),
            general: Specialist::new(
                "general",
                "You are Torque, a friendly car-research assistant. Answer \
                 helpfully and steer the conversation toward how you can help \
                 with parts, builds, shopping, or maintenance.",
                &["vehicle_specs", "web_search"],
            ),
            recovery: Specialist {
                max_iterations: 3,
                ..Specialist::new(
                    "recovery",
                    crate::recovery::RECOVERY_SYSTEM_PROMPT,
                    &[
                        "part_search",
                        "vehicle_specs",
                        "build_guides",
                        "repair_guides",
                        "listing_search",
                        "web_search",
                    ],
                )
            },
        }
    }

    /// The specialist serving an intent.
    pub fn for_intent(&self, intent: Intent) -> &Specialist {
        match intent {
            Intent::Vision => &self.vision,
            Intent::PartsLookup => &self.parts,
            Intent::BuildPlanning => &self.build,
            Intent::CarShopping => &self.shopping,
            Intent::Specs => &self.specs,
            Intent::Maintenance => &self.maintenance,
            Intent::Clarify => &self.clarify,
            Intent::General => &self.general,
        }
    }

    /// The broad-toolset recovery specialist.
    pub fn recovery(&self) -> &Specialist {
        &self.recovery
    }
}

/// Timing record for one capability invocation within a turn.
#[derive(Debug, Clone)]
pub struct ToolTiming {
    pub name: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

/// Token usage plus its cost for one specialist execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageReport {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_cents: u32,
}

impl UsageReport {
    fn from_usage(model: &str, usage: TokenUsage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost_cents: cost_cents(model, usage),
        }
    }
}

/// Everything one specialist execution produced.
///
/// Owned solely by the invocation that produced it; nothing here is
/// persisted beyond the request.
#[derive(Debug, Clone)]
pub struct AgentExecutionResult {
    pub raw_text: String,
    pub tool_calls_used: Vec<String>,
    pub tool_timings: Vec<ToolTiming>,
    pub usage: UsageReport,
    pub duration_ms: u64,
}

/// Drives the generate/tool/generate loop for one specialist role.
pub struct SpecialistExecutor {
    client: Arc<dyn InferenceClient>,
    invoker: Arc<ToolInvoker>,
    default_model: String,
    max_tokens: u32,
}

impl SpecialistExecutor {
    /// Create an executor.
    pub fn new(
        client: Arc<dyn InferenceClient>,
        invoker: Arc<ToolInvoker>,
        default_model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            invoker,
            default_model: default_model.into(),
            max_tokens,
        }
    }

    /// Run one specialist over the turn.
    ///
    /// Terminates when the model stops requesting tools, or after
    /// `max_iterations` rounds; hitting the bound returns whatever text
    /// accumulated rather than an error. Inference failures propagate so
    /// the orchestrator can escalate to recovery.
    pub async fn execute(
        &self,
        message: &str,
        has_image: bool,
        history: &ConversationWindow,
        context: &FilteredContext,
        specialist: &Specialist,
    ) -> Result<AgentExecutionResult, OrchestratorError> {
        let started = Instant::now();
        let model = specialist
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let system = Self::compose_system_prompt(&specialist.system_prompt, context);
        let tools = self
            .invoker
            .registry()
            .definitions_for(&specialist.allowed_tools);

        let user_text = if has_image {
            format!("{}\n{}", message, IMAGE_MARKER)
        } else {
            message.to_string()
        };

        let mut messages = history.to_chat_messages();
        messages.push(ChatMessage::user(user_text));

        let mut usage = TokenUsage::default();
        let mut raw_text = String::new();
        let mut tool_calls_used = Vec::new();
        let mut tool_timings = Vec::new();

        for iteration in 0..specialist.max_iterations {
            let request = ChatRequest {
                model: model.clone(),
                max_tokens: self.max_tokens,
                system: Some(system.clone()),
                messages: messages.clone(),
                tools: tools.clone(),
            };

            let response = self.client.complete(request).await?;
            usage.add(response.usage);

            let text = response.text();
            if !text.is_empty() {
                if !raw_text.is_empty() {
                    raw_text.push('\n');
                }
                raw_text.push_str(&text);
            }

            if !response.wants_tools() {
                debug!(
                    specialist = specialist.id,
                    iterations = iteration + 1,
                    "specialist loop terminal"
                );
                break;
            }

            if iteration + 1 == specialist.max_iterations {
                // Budget exhausted while the model still wants tools:
                // graceful degradation, not an error.
                warn!(
                    specialist = specialist.id,
                    max_iterations = specialist.max_iterations,
                    "iteration budget reached with pending tool requests"
                );
                break;
            }

            let requested: Vec<ToolCall> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| ToolCall::new(id, name, input.clone()))
                .collect();

            messages.push(ChatMessage::assistant_blocks(response.content.clone()));

            // Sequential, in request order; result order fed back to the
            // model mirrors the request order exactly.
            let mut results = Vec::with_capacity(requested.len());
            for call in requested {
                let invocation_context = InvocationContext {
                    turn_id: None,
                    intent_label: Some(specialist.id.to_string()),
                };
                let invocation = self.invoker.invoke(call, invocation_context).await;

                tool_calls_used.push(invocation.name.clone());
                tool_timings.push(ToolTiming {
                    name: invocation.name.clone(),
                    duration_ms: invocation.duration_ms,
                    timed_out: invocation.timed_out,
                });

                results.push(ContentBlock::tool_result(
                    invocation.call_id,
                    invocation.output.to_string(),
                    !invocation.success,
                ));
            }
            messages.push(ChatMessage::tool_results(results));
        }

        let result = AgentExecutionResult {
            raw_text,
            tool_calls_used,
            tool_timings,
            usage: UsageReport::from_usage(&model, usage),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            specialist = specialist.id,
            model = %model,
            tools_used = result.tool_calls_used.len(),
            output_chars = result.raw_text.len(),
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            "specialist execution complete"
        );

        Ok(result)
    }

    fn compose_system_prompt(base: &str, context: &FilteredContext) -> String {
        let rendered = context.render();
        if rendered.is_empty() {
            base.to_string()
        } else {
            format!("{}\n\n[USER CONTEXT]\n{}", base, rendered)
        }
    }
}
