//! Output formatting for user-facing presentation.
//!
//! Cheap textual cleanups run on every response: internal blocks are
//! stripped, throat-clearing preambles dropped, and list/heading
//! conventions normalized. A second, LLM-based cleanup pass on the fast
//! model only runs when the text does not already look like clean
//! user-facing content - most responses skip it, which is the point.

use std::sync::{Arc, OnceLock};

use assistant_core::{ChatMessage, ChatRequest, InferenceClient};
use regex::Regex;
use tracing::{debug, warn};

use crate::markup::strip_internal_blocks;

/// System prompt for the presentation-only rewrite pass.
pub const FORMATTER_SYSTEM_PROMPT: &str = "Rewrite the following assistant \
response for clean presentation: fix formatting, remove filler preambles, \
keep lists tidy. Do not add, remove, or alter any substantive claim. \
Respond with the rewritten text only.";

fn content_start_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^#{1,4}\s",
            r"^\*\*",
            r"^- ",
            r"^\d+\.\s",
            r"^[A-Z0-9]",
        ]
        .iter()
        .map(|s| Regex::new(s).expect("content-start regex is statically valid"))
        .collect()
    })
}

fn preamble_start_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^(I will|I'll|I am going to|I'm going to)\b",
            r"^(Let me|Allow me)\b",
            r"^(Sure|Okay|Alright|Certainly|Of course)[,!.]",
            r"^Great question",
            r"^Happy to help",
        ]
        .iter()
        .map(|s| Regex::new(s).expect("preamble regex is statically valid"))
        .collect()
    })
}

/// Whether text already reads as clean user-facing content.
///
/// True when the text opens like content (heading, list, bold, sentence)
/// and does not open like a preamble.
pub fn looks_clean(text: &str) -> bool {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return false;
    }
    let starts_like_content = content_start_patterns()
        .iter()
        .any(|p| p.is_match(trimmed));
    let starts_like_preamble = preamble_start_patterns()
        .iter()
        .any(|p| p.is_match(trimmed));
    starts_like_content && !starts_like_preamble
}

/// Deterministic cleanup pass. Idempotent.
pub fn clean(text: &str) -> String {
    let stripped = strip_internal_blocks(text);
    let lines: Vec<&str> = stripped.lines().collect();

    // Drop leading preamble lines, but never strip the text down to nothing.
    let mut start = 0;
    while start < lines.len() {
        let line = lines[start].trim();
        if line.is_empty() {
            start += 1;
            continue;
        }
        let is_preamble = preamble_start_patterns().iter().any(|p| p.is_match(line));
        let has_more_content = lines[start + 1..].iter().any(|l| !l.trim().is_empty());
        if is_preamble && has_more_content {
            start += 1;
        } else {
            break;
        }
    }

    let normalized: Vec<String> = lines[start..]
        .iter()
        .map(|line| normalize_line(line))
        .collect();

    normalized.join("\n").trim().to_string()
}

/// Normalize one line's list and numbering conventions.
fn normalize_line(line: &str) -> String {
    static NUMBER_PAREN: OnceLock<Regex> = OnceLock::new();
    let number_paren = NUMBER_PAREN
        .get_or_init(|| Regex::new(r"^(\s*)(\d+)\)\s").expect("numbering regex is statically valid"));

    let line = number_paren.replace(line, "$1$2. ");

    // Star and unicode bullets become dashes.
    if let Some(rest) = line.strip_prefix("* ") {
        return format!("- {}", rest);
    }
    if let Some(rest) = line.strip_prefix("\u{2022} ") {
        return format!("- {}", rest);
    }
    line.into_owned()
}

/// The output formatter.
pub struct OutputFormatter {
    client: Arc<dyn InferenceClient>,
    model: String,
}

impl OutputFormatter {
    /// Create a formatter using `model` (the fast model) for the rewrite pass.
    pub fn new(client: Arc<dyn InferenceClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Format a complete response. Never fails.
    ///
    /// Already-clean text is returned unchanged; otherwise one
    /// presentation-only rewrite runs on the fast model, and any failure
    /// there falls back to the locally cleaned text.
    pub async fn format(&self, text: &str) -> String {
        let cleaned = clean(text);
        if cleaned.is_empty() {
            return cleaned;
        }
        if looks_clean(&cleaned) {
            debug!("output already clean, skipping rewrite pass");
            return cleaned;
        }

        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system: Some(FORMATTER_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(cleaned.clone())],
            tools: Vec::new(),
        };

        match self.client.complete(request).await {
            Ok(response) => {
                let rewritten = clean(&response.text());
                if rewritten.is_empty() {
                    warn!("rewrite pass returned nothing, keeping local cleanup");
                    cleaned
                } else {
                    rewritten
                }
            }
            Err(error) => {
                warn!(error = %error, "rewrite pass failed, keeping local cleanup");
                cleaned
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_inference::{text_response, FailingInference, ScriptedInference};

    #[test]
    fn test_clean_strips_internal_blocks() {
        let text = "Good options below.\n<vehicle_notes>owns GTI</vehicle_notes>\n- Intake";
        let cleaned = clean(text);
        assert!(!cleaned.contains("vehicle_notes"));
        assert!(cleaned.contains("- Intake"));
    }

    #[test]
    fn test_clean_drops_leading_preamble() {
        let text = "Let me look into that for you.\nThe GR86 makes 228 hp.";
        assert_eq!(clean(text), "The GR86 makes 228 hp.");
    }

    #[test]
    fn test_clean_keeps_preamble_if_it_is_everything() {
        let text = "Let me look into that for you.";
        assert_eq!(clean(text), text);
    }

    #[test]
    fn test_clean_normalizes_numbering_and_bullets() {
        let text = "1) Intake\n2) Tune\n* Exhaust\n\u{2022} Springs";
        assert_eq!(clean(text), "1. Intake\n2. Tune\n- Exhaust\n- Springs");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let cases = [
            "## Stage 1 parts\n1. Tune\n2. Intake",
            "The GR86 makes 228 hp.",
            "- one\n- two",
        ];
        for text in cases {
            let once = clean(text);
            assert_eq!(clean(&once), once);
        }
    }

    #[test]
    fn test_looks_clean() {
        assert!(looks_clean("## Stage 1 options"));
        assert!(looks_clean("The GR86 makes 228 hp."));
        assert!(looks_clean("- intake\n- tune"));
        assert!(looks_clean("1. First step"));

        assert!(!looks_clean("I'll check the catalog for you."));
        assert!(!looks_clean("Let me pull up those specs."));
        assert!(!looks_clean("Sure, here's what I found."));
        assert!(!looks_clean(""));
    }

    #[tokio::test]
    async fn test_format_clean_text_is_noop() {
        let client = Arc::new(ScriptedInference::new(Vec::new()));
        let formatter = OutputFormatter::new(client.clone(), "torque-fast");

        let text = "The GR86 makes 228 hp from its 2.4L flat-four.";
        let formatted = formatter.format(text).await;

        assert_eq!(formatted, text);
        // Cost optimization: no rewrite call was made.
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_format_rewrites_messy_text() {
        let client = Arc::new(ScriptedInference::new(vec![text_response(
            "Here are solid stage 1 picks:\n1. Tune\n2. Intake",
        )]));
        let formatter = OutputFormatter::new(client.clone(), "torque-fast");

        // Lowercase start matches neither whitelist nor blacklist: rewrite runs.
        let formatted = formatter.format("so, basically, you want a tune first").await;

        assert_eq!(client.request_count(), 1);
        assert!(formatted.contains("1. Tune"));
    }

    #[tokio::test]
    async fn test_format_rewrite_failure_keeps_local_cleanup() {
        let client = Arc::new(FailingInference::new());
        let formatter = OutputFormatter::new(client, "torque-fast");

        let formatted = formatter.format("so here's the deal with tunes").await;
        assert_eq!(formatted, "so here's the deal with tunes");
    }

    #[tokio::test]
    async fn test_format_uses_fast_model() {
        let client = Arc::new(ScriptedInference::new(vec![text_response("Tidy answer.")]));
        let formatter = OutputFormatter::new(client.clone(), "torque-fast");

        formatter.format("messy, lowercase ramble").await;

        let requests = client.requests();
        assert_eq!(requests[0].model, "torque-fast");
    }
}
