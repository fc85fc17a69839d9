//! Last-resort recovery when the primary pipeline fails.
//!
//! Invoked when the specialist executor errors out, the orchestration
//! deadline fires, or validation and formatting both fail to produce
//! usable output. One broader-toolset pass runs with instructions that
//! forbid refusing; if that also fails, a static intent-keyed template is
//! the terminal answer. The static path has no dependencies and cannot
//! fail - the user always gets prose.

use std::sync::Arc;

use assistant_core::{ConversationWindow, FilteredContext};
use tracing::{info, warn};

use crate::intent::Intent;
use crate::specialist::{SpecialistExecutor, SpecialistSet};
use crate::validator::MIN_CONTENT_LENGTH;

/// Instruction set for the recovery pass.
///
/// The primary pipeline already failed this user once; the recovery pass
/// is not allowed to fail them a second time by refusing.
pub const RECOVERY_SYSTEM_PROMPT: &str = "You are Torque, a car-research \
assistant, answering after an earlier attempt failed. Rules: never say \
information is unavailable or that you cannot help. Answer from general \
automotive knowledge, and use web_search as a last resort for anything \
you are unsure of. Keep the answer practical, and always end with one \
concrete, actionable next step the user can take.";

/// Runs the recovery pass and owns the terminal static fallback.
pub struct RecoveryExecutor {
    executor: Arc<SpecialistExecutor>,
    specialists: Arc<SpecialistSet>,
}

impl RecoveryExecutor {
    /// Create a recovery executor sharing the pipeline's executor.
    pub fn new(executor: Arc<SpecialistExecutor>, specialists: Arc<SpecialistSet>) -> Self {
        Self {
            executor,
            specialists,
        }
    }

    /// Produce a response no matter what. Infallible by construction.
    pub async fn recover(
        &self,
        message: &str,
        history: &ConversationWindow,
        context: &FilteredContext,
        intent: Intent,
    ) -> String {
        info!(intent = intent.as_str(), "recovery executor engaged");

        match self
            .executor
            .execute(
                message,
                false,
                history,
                context,
                self.specialists.recovery(),
            )
            .await
        {
            Ok(result) => {
                let text = crate::markup::strip_internal_blocks(&result.raw_text);
                let text = text.trim();
                if text.len() >= MIN_CONTENT_LENGTH {
                    return text.to_string();
                }
                warn!(
                    chars = text.len(),
                    "recovery pass output unusable, using static fallback"
                );
            }
            Err(error) => {
                warn!(error = %error, "recovery pass failed, using static fallback");
            }
        }

        static_fallback(intent).to_string()
    }
}

/// The terminal intent-keyed fallback. No network, no dependencies.
pub fn static_fallback(intent: Intent) -> &'static str {
    match intent {
        Intent::Vision => {
            "I couldn't analyze that image just now. Try re-uploading it, or \
             tell me the year, make, and model and I'll work from that instead."
        }
        Intent::PartsLookup => {
            "I'm having trouble reaching the parts catalog right now. Tell me \
             your car and the kind of upgrade you're after, and I'll walk you \
             through the usual options and what to check for fitment."
        }
        Intent::BuildPlanning => {
            "I couldn't pull together a full build plan just now. A solid \
             starting order for most builds: tires and brakes, then \
             suspension, then power. Tell me your car and budget and we'll \
             plan the first stage."
        }
        Intent::CarShopping => {
            "I couldn't run a full market search right now. Tell me your \
             budget, how you'll use the car, and any must-haves, and I'll \
             suggest models worth shortlisting."
        }
        Intent::Specs => {
            "I couldn't pull exact figures just now. Tell me the year and \
             trim you care about and I'll look the numbers up again in a \
             moment."
        }
        Intent::Maintenance => {
            "I couldn't finish the diagnostic lookup. Describe the symptom, \
             when it happens, and any warning lights, and I'll narrow down \
             likely causes with you."
        }
        Intent::Clarify | Intent::General => {
            "Something went wrong on my end while answering that. Could you \
             try asking again, maybe with your car's year, make, and model? \
             I'll take it from there."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialist::SpecialistExecutor;
    use assistant_tools::{InvokerPolicy, ToolInvoker, ToolRegistry};
    use mock_inference::{FailingInference, ScriptedInference};

    fn recovery_with(client: Arc<dyn assistant_core::InferenceClient>) -> RecoveryExecutor {
        let invoker = Arc::new(ToolInvoker::with_policy(
            Arc::new(ToolRegistry::new()),
            InvokerPolicy::default(),
        ));
        let executor = Arc::new(SpecialistExecutor::new(
            client,
            invoker,
            "torque-large",
            1024,
        ));
        RecoveryExecutor::new(executor, Arc::new(SpecialistSet::default_set()))
    }

    #[tokio::test]
    async fn test_recovery_pass_answer_is_used() {
        let client = Arc::new(ScriptedInference::single_text(
            "From general knowledge: a stage 1 tune alone is safe on stock \
             hardware. Next step: confirm your ECU revision with a dealer scan.",
        ));
        let recovery = recovery_with(client);

        let text = recovery
            .recover(
                "stage 1 safe?",
                &ConversationWindow::new(),
                &FilteredContext::default(),
                Intent::PartsLookup,
            )
            .await;

        assert!(text.contains("stage 1 tune"));
    }

    #[tokio::test]
    async fn test_failed_recovery_pass_hits_static_fallback() {
        let recovery = recovery_with(Arc::new(FailingInference::new()));

        let text = recovery
            .recover(
                "stage 1 safe?",
                &ConversationWindow::new(),
                &FilteredContext::default(),
                Intent::PartsLookup,
            )
            .await;

        assert_eq!(text, static_fallback(Intent::PartsLookup));
    }

    #[tokio::test]
    async fn test_too_short_recovery_output_hits_static_fallback() {
        let recovery = recovery_with(Arc::new(ScriptedInference::single_text("ok")));

        let text = recovery
            .recover(
                "help",
                &ConversationWindow::new(),
                &FilteredContext::default(),
                Intent::General,
            )
            .await;

        assert_eq!(text, static_fallback(Intent::General));
    }

    #[test]
    fn test_static_fallback_is_total_and_substantive() {
        for intent in Intent::ALL {
            let text = static_fallback(intent);
            assert!(text.len() >= MIN_CONTENT_LENGTH);
            assert!(!text.contains('<'));
        }
    }
}
