//! Two-tier intent classification: patterns first, LLM fallback.
//!
//! The pattern tier is free and instant; the LLM tier costs one lightweight
//! inference call and is only consulted when patterns are not confident.
//! Classification never fails: every failure mode degrades to the
//! catch-all category at reduced confidence.

use std::sync::Arc;

use assistant_core::{
    hash_prompt, ChatMessage, ChatRequest, ContextBundle, ConversationWindow, InferenceClient,
    SlotKey, SlotPayload,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::intent::{ClassificationResult, Intent};
use crate::patterns::PatternClassifier;

/// Pattern matches at or above this confidence skip the LLM tier.
pub const PATTERN_CONFIDENCE_THRESHOLD: f32 = 0.8;

/// Default number of history turns shown to the LLM tier.
pub const DEFAULT_CLASSIFIER_HISTORY_TURNS: usize = 6;

/// System prompt for the LLM classification call.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You classify car-research questions into exactly one category.

Categories:
- parts_lookup: parts, tuning, and upgrade questions
- build_planning: planning a multi-step project build
- car_shopping: choosing or finding a car to buy
- specs: factual vehicle specification questions
- maintenance: repairs, diagnostics, and service
- clarify: the message is too ambiguous to act on and needs a clarifying question
- general: anything else

Respond with JSON only:
{"intent": "<category>", "confidence": <0.0-1.0>, "reasoning": "<one short sentence>", "car_context": "<vehicle the message is about, or omit>"}

Use the conversation context to resolve short or ambiguous messages. Never invent a category outside the list."#;

/// The parsed shape of the LLM tier's answer.
#[derive(Debug, Deserialize)]
struct LlmVerdict {
    intent: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    car_context: Option<String>,
}

/// Acknowledgement words that inherit the previous turn's intent.
const ACKNOWLEDGEMENTS: &[&str] = &[
    "yes", "yeah", "yep", "ok", "okay", "sure", "sounds good", "thanks", "thank you", "please",
    "go ahead", "do it",
];

/// Intent classifier: vision short-circuit, pattern tier, LLM tier.
pub struct IntentClassifier {
    patterns: PatternClassifier,
    client: Arc<dyn InferenceClient>,
    model: String,
    history_turns: usize,
}

impl IntentClassifier {
    /// Create a classifier using `model` (typically the fast model) for
    /// the LLM tier.
    pub fn new(client: Arc<dyn InferenceClient>, model: impl Into<String>) -> Self {
        let model = model.into();
        info!(
            model = %model,
            prompt_hash = %hash_prompt(CLASSIFIER_SYSTEM_PROMPT),
            "intent classifier initialized"
        );
        Self {
            patterns: PatternClassifier::new(),
            client,
            model,
            history_turns: DEFAULT_CLASSIFIER_HISTORY_TURNS,
        }
    }

    /// Override the number of history turns shown to the LLM tier.
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    /// Classify one user turn. Never fails.
    pub async fn classify(
        &self,
        message: &str,
        history: &ConversationWindow,
        context: &ContextBundle,
        has_image: bool,
    ) -> ClassificationResult {
        // An attached image decides the route outright.
        if has_image {
            return ClassificationResult::from_pattern(Intent::Vision, 1.0, "image attached");
        }

        // Short acknowledgements continue whatever the assistant was doing;
        // routing them to the catch-all would derail multi-turn flows.
        if Self::is_acknowledgement(message) {
            if let Some(previous) = history.last_assistant().and_then(Self::infer_reply_intent) {
                debug!(intent = previous.as_str(), "acknowledgement inherits previous intent");
                return ClassificationResult::from_pattern(
                    previous,
                    0.6,
                    "acknowledgement follow-up inherits previous intent",
                );
            }
        }

        if let Some(m) = self.patterns.classify(message) {
            if m.confidence >= PATTERN_CONFIDENCE_THRESHOLD {
                debug!(intent = m.intent.as_str(), rule = m.rule, "pattern tier decided");
                return ClassificationResult::from_pattern(
                    m.intent,
                    m.confidence,
                    format!("pattern rule {}", m.rule),
                );
            }
            debug!(
                intent = m.intent.as_str(),
                confidence = m.confidence,
                "pattern match below threshold, consulting LLM tier"
            );
        }

        self.classify_with_llm(message, history, context).await
    }

    /// The LLM tier: one lightweight, stateless, low-budget call.
    async fn classify_with_llm(
        &self,
        message: &str,
        history: &ConversationWindow,
        context: &ContextBundle,
    ) -> ClassificationResult {
        let input = self.format_classifier_input(message, history, context);

        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: 256,
            system: Some(CLASSIFIER_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(input)],
            tools: Vec::new(),
        };

        let response = match self.client.complete(request).await {
            Ok(response) => response,
            Err(error) => {
                // Soft failure: classification ambiguity is never an error.
                warn!(error = %error, "LLM classification failed");
                return ClassificationResult::fallback("LLM tier unavailable", true);
            }
        };

        let text = response.text();
        match Self::parse_verdict(&text) {
            Some(verdict) => verdict,
            None => {
                warn!(raw = %text, "unparseable classification response");
                ClassificationResult::fallback("unparseable classification response", true)
            }
        }
    }

    /// Build the LLM tier's input from recent history plus the message.
    fn format_classifier_input(
        &self,
        message: &str,
        history: &ConversationWindow,
        context: &ContextBundle,
    ) -> String {
        let mut parts = Vec::new();

        let recent = history.last_turns(self.history_turns);
        if !recent.is_empty() {
            let lines: Vec<String> = recent
                .messages()
                .iter()
                .map(|m| {
                    let role = match m.role {
                        assistant_core::Role::User => "user",
                        assistant_core::Role::Assistant => "assistant",
                    };
                    format!("{}: {}", role, m.content)
                })
                .collect();
            parts.push(format!("[CONTEXT]\n{}", lines.join("\n")));
        }

        if let Some(SlotPayload::CurrentSubjectVehicle { vehicle }) =
            context.get(SlotKey::CurrentSubjectVehicle)
        {
            parts.push(format!("[SUBJECT VEHICLE: {}]", vehicle.label()));
        }

        parts.push(format!("[MESSAGE]\n{}", message));
        parts.join("\n\n")
    }

    /// Parse the first well-formed JSON verdict out of the response text.
    ///
    /// Out-of-taxonomy labels are treated the same as parse failures; the
    /// caller falls back. An unstructured answer is a first-class outcome
    /// here, not a bug.
    fn parse_verdict(text: &str) -> Option<ClassificationResult> {
        let json = extract_json(text);
        let verdict: LlmVerdict = serde_json::from_str(json).ok()?;
        let intent = Intent::from_label(&verdict.intent)?;

        Some(ClassificationResult::from_llm(
            intent,
            verdict.confidence.unwrap_or(0.5),
            verdict
                .reasoning
                .unwrap_or_else(|| "no reasoning given".to_string()),
            verdict.car_context.filter(|c| !c.trim().is_empty()),
        ))
    }

    /// Whether the message is a bare acknowledgement of the previous turn.
    fn is_acknowledgement(message: &str) -> bool {
        let normalized = message
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric() && !c.is_whitespace())
            .to_lowercase();
        !normalized.is_empty() && ACKNOWLEDGEMENTS.contains(&normalized.as_str())
    }

    /// Reconstruct the intent behind the assistant's last reply from its
    /// characteristic phrasing.
    fn infer_reply_intent(reply: &str) -> Option<Intent> {
        let lower = reply.to_lowercase();
        // Ordered like the pattern rules: parts before build.
        if lower.contains("stage") || lower.contains("intake") || lower.contains("exhaust")
            || lower.contains("part")
        {
            return Some(Intent::PartsLookup);
        }
        if lower.contains("build plan") || lower.contains("build order") || lower.contains("mod list")
        {
            return Some(Intent::BuildPlanning);
        }
        if lower.contains("listing") || lower.contains("for sale") || lower.contains("worth buying")
        {
            return Some(Intent::CarShopping);
        }
        if lower.contains("misfire") || lower.contains("service") || lower.contains("repair") {
            return Some(Intent::Maintenance);
        }
        None
    }
}

/// Extract JSON from a response that may contain markdown or other text.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if trimmed.starts_with('{') {
        return extract_balanced_json(trimmed);
    }

    // JSON inside a fenced code block, with or without a language tag.
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        if let Some(end) = after[body_start..].find("```") {
            let extracted = after[body_start..body_start + end].trim();
            return extract_balanced_json(extracted);
        }
    }

    // First JSON object embedded in prose.
    if let Some(start) = trimmed.find('{') {
        return extract_balanced_json(&trimmed[start..]);
    }

    trimmed
}

/// Extract a balanced JSON object from a string that starts with '{'.
///
/// Handles models appending trailing characters, e.g.
/// `{"intent": "specs"}}}` -> `{"intent": "specs"}`.
fn extract_balanced_json(s: &str) -> &str {
    if !s.starts_with('{') {
        return s;
    }

    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return &s[..=i];
                }
            }
            _ => {}
        }
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::HistoryMessage;
    use mock_inference::{text_response, FailingInference, ScriptedInference};

    fn classifier_with(client: Arc<dyn InferenceClient>) -> IntentClassifier {
        IntentClassifier::new(client, "torque-fast")
    }

    fn verdict_json(intent: &str) -> String {
        format!(
            r#"{{"intent": "{}", "confidence": 0.7, "reasoning": "test"}}"#,
            intent
        )
    }

    #[tokio::test]
    async fn test_vision_short_circuit() {
        let client = Arc::new(ScriptedInference::new(Vec::new()));
        let classifier = classifier_with(client.clone());

        let result = classifier
            .classify(
                "what is this",
                &ConversationWindow::new(),
                &ContextBundle::new(),
                true,
            )
            .await;

        assert_eq!(result.intent, Intent::Vision);
        assert_eq!(result.confidence, 1.0);
        assert!(!result.used_llm);
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_a_pattern_hit_skips_llm() {
        let client = Arc::new(ScriptedInference::new(Vec::new()));
        let classifier = classifier_with(client.clone());

        let result = classifier
            .classify(
                "Stage 1 tune options for my car",
                &ConversationWindow::new(),
                &ContextBundle::new(),
                false,
            )
            .await;

        assert_eq!(result.intent, Intent::PartsLookup);
        assert!(result.confidence >= 0.8);
        assert!(!result.used_llm);
        // The LLM tier is never invoked.
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_b_punctuation_goes_to_llm() {
        let client = Arc::new(ScriptedInference::new(vec![text_response(verdict_json(
            "clarify",
        ))]));
        let classifier = classifier_with(client.clone());

        let result = classifier
            .classify("?", &ConversationWindow::new(), &ContextBundle::new(), false)
            .await;

        assert_eq!(client.request_count(), 1);
        assert!(result.used_llm);
        // The conforming clarifying answer is honored, not the catch-all.
        assert_eq!(result.intent, Intent::Clarify);
    }

    #[tokio::test]
    async fn test_llm_verdict_in_fenced_block() {
        let fenced = format!("```json\n{}\n```", verdict_json("car_shopping"));
        let client = Arc::new(ScriptedInference::new(vec![text_response(fenced)]));
        let classifier = classifier_with(client);

        let result = classifier
            .classify(
                "something to daily that's fun",
                &ConversationWindow::new(),
                &ContextBundle::new(),
                false,
            )
            .await;

        assert_eq!(result.intent, Intent::CarShopping);
    }

    #[tokio::test]
    async fn test_out_of_taxonomy_label_falls_back() {
        let client = Arc::new(ScriptedInference::new(vec![text_response(verdict_json(
            "chitchat",
        ))]));
        let classifier = classifier_with(client);

        let result = classifier
            .classify(
                "hey there",
                &ConversationWindow::new(),
                &ContextBundle::new(),
                false,
            )
            .await;

        assert_eq!(result.intent, Intent::General);
        assert!(result.confidence < 0.5);
    }

    #[tokio::test]
    async fn test_llm_failure_is_soft() {
        let client = Arc::new(FailingInference::new());
        let classifier = classifier_with(client);

        let result = classifier
            .classify(
                "hmm not sure what I want",
                &ConversationWindow::new(),
                &ContextBundle::new(),
                false,
            )
            .await;

        assert_eq!(result.intent, Intent::General);
        assert!(result.used_llm);
        assert!(result.confidence < 0.5);
    }

    #[tokio::test]
    async fn test_acknowledgement_inherits_previous_intent() {
        let client = Arc::new(ScriptedInference::new(Vec::new()));
        let classifier = classifier_with(client.clone());

        let history = ConversationWindow::from_messages(vec![
            HistoryMessage::user("stage 2 options?"),
            HistoryMessage::assistant(
                "For stage 2 you'd want a downpipe and an intake along with the tune.",
            ),
        ]);

        let result = classifier
            .classify("yes", &history, &ContextBundle::new(), false)
            .await;

        assert_eq!(result.intent, Intent::PartsLookup);
        assert!(!result.used_llm);
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_classification_stays_in_taxonomy() {
        // Whatever junk the LLM returns, the result is a taxonomy member.
        let junk = vec![
            text_response("not json at all"),
            text_response(r#"{"intent": 42}"#),
            text_response(r#"{"intent": "parts_lookup", "confidence": 9.0}"#),
        ];

        for response in junk {
            let client = Arc::new(ScriptedInference::new(vec![response]));
            let classifier = classifier_with(client);
            let result = classifier
                .classify(
                    "mystery message",
                    &ConversationWindow::new(),
                    &ContextBundle::new(),
                    false,
                )
                .await;

            assert!(Intent::ALL.contains(&result.intent));
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }

    #[test]
    fn test_extract_balanced_json_trailing_braces() {
        let input = r#"{"intent": "specs"}}}"#;
        assert_eq!(extract_balanced_json(input), r#"{"intent": "specs"}"#);
    }

    #[test]
    fn test_extract_balanced_json_with_strings() {
        let input = r#"{"reasoning": "braces { inside } a string", "intent": "general"}"#;
        assert_eq!(extract_balanced_json(input), input);
    }

    #[test]
    fn test_extract_balanced_json_escaped_quotes() {
        let input = r#"{"reasoning": "said \"stage 2\"", "intent": "parts_lookup"}"#;
        assert_eq!(extract_balanced_json(input), input);
    }

    #[test]
    fn test_extract_json_from_prose() {
        let input = r#"Here is my answer: {"intent": "specs"} hope that helps"#;
        assert_eq!(extract_json(input), r#"{"intent": "specs"}"#);
    }

    #[test]
    fn test_is_acknowledgement() {
        assert!(IntentClassifier::is_acknowledgement("yes"));
        assert!(IntentClassifier::is_acknowledgement("  Thanks! "));
        assert!(IntentClassifier::is_acknowledgement("sounds good"));
        assert!(!IntentClassifier::is_acknowledgement("yes but what about tires"));
    }
}
