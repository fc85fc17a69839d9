//! The closed intent taxonomy and per-turn classification result.

use serde::{Deserialize, Serialize};

/// What kind of help the user's message is seeking.
///
/// This is a closed set: classification always lands on one of these
/// variants, never an arbitrary label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// The turn carries an image to analyze.
    Vision,
    /// Parts, tuning, and upgrade lookups.
    PartsLookup,
    /// Multi-step project build planning.
    BuildPlanning,
    /// Choosing or finding a car to buy.
    CarShopping,
    /// Factual vehicle specifications.
    Specs,
    /// Repairs, diagnostics, and service.
    Maintenance,
    /// Input too ambiguous to act on; ask a clarifying question.
    Clarify,
    /// Generic catch-all.
    General,
}

impl Intent {
    /// Every member of the taxonomy.
    pub const ALL: [Intent; 8] = [
        Intent::Vision,
        Intent::PartsLookup,
        Intent::BuildPlanning,
        Intent::CarShopping,
        Intent::Specs,
        Intent::Maintenance,
        Intent::Clarify,
        Intent::General,
    ];

    /// Stable label used in logs and classifier prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::PartsLookup => "parts_lookup",
            Self::BuildPlanning => "build_planning",
            Self::CarShopping => "car_shopping",
            Self::Specs => "specs",
            Self::Maintenance => "maintenance",
            Self::Clarify => "clarify",
            Self::General => "general",
        }
    }

    /// Parse a label back into the taxonomy.
    ///
    /// Tolerant of case and surrounding whitespace; anything outside the
    /// closed set returns `None` so callers fall back explicitly.
    pub fn from_label(label: &str) -> Option<Intent> {
        let normalized = label.trim().to_lowercase();
        Intent::ALL
            .iter()
            .copied()
            .find(|intent| intent.as_str() == normalized)
    }
}

/// The immutable classification produced once per user turn.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub intent: Intent,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Short human-readable justification, for logs.
    pub reasoning: String,
    /// Whether the LLM tier was consulted.
    pub used_llm: bool,
    /// The vehicle the message is about, when the classifier extracted one.
    pub car_context: Option<String>,
}

impl ClassificationResult {
    /// Build a result from the pattern tier.
    pub fn from_pattern(intent: Intent, confidence: f32, reasoning: impl Into<String>) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            used_llm: false,
            car_context: None,
        }
    }

    /// Build a result from the LLM tier.
    pub fn from_llm(
        intent: Intent,
        confidence: f32,
        reasoning: impl Into<String>,
        car_context: Option<String>,
    ) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            used_llm: true,
            car_context,
        }
    }

    /// The catch-all result used when classification cannot do better.
    pub fn fallback(reasoning: impl Into<String>, used_llm: bool) -> Self {
        Self {
            intent: Intent::General,
            confidence: 0.3,
            reasoning: reasoning.into(),
            used_llm,
            car_context: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for intent in Intent::ALL {
            assert_eq!(Intent::from_label(intent.as_str()), Some(intent));
        }
    }

    #[test]
    fn test_from_label_tolerates_case_and_whitespace() {
        assert_eq!(Intent::from_label("  Parts_Lookup "), Some(Intent::PartsLookup));
        assert_eq!(Intent::from_label("GENERAL"), Some(Intent::General));
    }

    #[test]
    fn test_from_label_rejects_out_of_taxonomy() {
        assert_eq!(Intent::from_label("chitchat"), None);
        assert_eq!(Intent::from_label(""), None);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let result = ClassificationResult::from_llm(Intent::Specs, 1.7, "r", None);
        assert_eq!(result.confidence, 1.0);

        let result = ClassificationResult::from_pattern(Intent::Specs, -0.2, "r");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_fallback_is_general_reduced_confidence() {
        let result = ClassificationResult::fallback("parse failed", true);
        assert_eq!(result.intent, Intent::General);
        assert!(result.confidence < 0.5);
        assert!(result.used_llm);
    }
}
