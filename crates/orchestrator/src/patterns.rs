//! Fast, deterministic intent guessing from message text.
//!
//! Rules are an ordered list of typed pattern+intent pairs evaluated in a
//! single pass; the first rule with a match wins, so list position *is*
//! the priority. Domain-specific categories come before weaker generic
//! rules - notably, parts lookup precedes build planning so an ambiguous
//! "stage" mention resolves to parts lookup.
//!
//! This tier never touches the network. It deliberately refuses to decide
//! short or ambiguous content (pure punctuation, lone filler words): those
//! fall through to the LLM tier, which can use conversation context.

use regex::Regex;

use crate::intent::Intent;

/// A matched rule: intent, rule confidence, and the rule's label.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub intent: Intent,
    pub confidence: f32,
    pub rule: &'static str,
}

/// One ordered classification rule.
struct PatternRule {
    intent: Intent,
    confidence: f32,
    label: &'static str,
    patterns: Vec<Regex>,
}

impl PatternRule {
    fn new(intent: Intent, confidence: f32, label: &'static str, sources: &[&str]) -> Self {
        let patterns = sources
            .iter()
            .map(|s| Regex::new(s).expect("pattern rule regex is statically valid"))
            .collect();
        Self {
            intent,
            confidence,
            label,
            patterns,
        }
    }

    fn matches(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(message))
    }
}

/// Lone words the pattern tier refuses to classify; conversation context
/// is needed to read them, and only the LLM tier sees that.
const AMBIGUOUS_WORDS: &[&str] = &[
    "yes", "yeah", "yep", "no", "nope", "ok", "okay", "sure", "thanks", "thank", "thx", "cool",
    "nice", "maybe", "hmm", "what", "why", "how", "help", "more",
];

/// Ordered pattern classifier.
pub struct PatternClassifier {
    rules: Vec<PatternRule>,
}

impl PatternClassifier {
    /// Create the classifier with the production rule list.
    pub fn new() -> Self {
        Self {
            rules: vec![
                // Parts lookup outranks build planning: an ambiguous
                // "stage" mention is a parts question.
                PatternRule::new(
                    Intent::PartsLookup,
                    0.85,
                    "parts_keywords",
                    &[
                        r"(?i)\bstage\s*[123]\b",
                        r"(?i)\b(tune[sd]?|tuning|intake|exhaust|downpipe|catback|headers?|coilovers?|lowering\s+springs?|sway\s+bars?|intercooler|turbo|supercharger|big\s+brake|brake\s+kit|short\s+shifter)\b",
                        r"(?i)\b(parts?|upgrades?|mods?)\s+(for|on)\b",
                    ],
                ),
                PatternRule::new(
                    Intent::BuildPlanning,
                    0.85,
                    "build_keywords",
                    &[
                        r"(?i)\b(build\s+(plan|list|sheet|order)|full\s+build|track\s+build|drift\s+build|project\s+car|mod\s+list|build\s+roadmap)\b",
                        r"(?i)\bplan\s+(out\s+)?my\s+build\b",
                    ],
                ),
                PatternRule::new(
                    Intent::Maintenance,
                    0.85,
                    "maintenance_keywords",
                    &[
                        r"(?i)\bp[01]\d{3}\b",
                        r"(?i)\b(check\s+engine|misfir\w+|rough\s+idle|won'?t\s+start|oil\s+change|service\s+interval|timing\s+(belt|chain)|brake\s+pads?\s+(wear|replace\w*)|coolant\s+leak|rattl\w+|squeak\w*)\b",
                    ],
                ),
                PatternRule::new(
                    Intent::CarShopping,
                    0.85,
                    "shopping_keywords",
                    &[
                        r"(?i)\b(should\s+i\s+buy|worth\s+buying|for\s+sale|listings?|shopping\s+for|look(ing)?\s+for\s+a\s+(car|truck|suv|daily))\b",
                        r"(?i)\bbest\s+(car|truck|suv|coupe|hatch\w*)\s+(for|under)\b",
                        r"(?i)\bunder\s+\$?\d+[,.]?\d*k?\b",
                    ],
                ),
                PatternRule::new(
                    Intent::Specs,
                    0.85,
                    "specs_keywords",
                    &[
                        r"(?i)\b(0-60|zero\s+to\s+sixty|quarter\s+mile|horsepower|curb\s+weight|top\s+speed|towing\s+capacity|ground\s+clearance|cargo\s+space|mpg|fuel\s+economy)\b",
                        r"(?i)\bspecs?\b",
                    ],
                ),
                // Comparisons are usually spec questions but often need
                // context to pin down; low confidence routes them through
                // the LLM tier with a hint.
                PatternRule::new(
                    Intent::Specs,
                    0.65,
                    "comparison_hint",
                    &[r"(?i)\b(vs\.?|versus|compared?\s+(to|with))\b"],
                ),
            ],
        }
    }

    /// Classify a message, or decline.
    ///
    /// Returns `None` for content this tier refuses to judge and for
    /// messages no rule matches.
    pub fn classify(&self, message: &str) -> Option<PatternMatch> {
        let trimmed = message.trim();
        if Self::too_ambiguous(trimmed) {
            return None;
        }

        self.rules
            .iter()
            .find(|rule| rule.matches(trimmed))
            .map(|rule| PatternMatch {
                intent: rule.intent,
                confidence: rule.confidence,
                rule: rule.label,
            })
    }

    /// Whether the pattern tier declines to judge this content.
    fn too_ambiguous(trimmed: &str) -> bool {
        if trimmed.is_empty() {
            return true;
        }
        // Pure punctuation: "?", "...", "!?".
        if trimmed.chars().all(|c| !c.is_alphanumeric()) {
            return true;
        }
        // A lone filler word carries no intent of its own.
        if !trimmed.contains(char::is_whitespace) {
            let word = trimmed
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if AMBIGUOUS_WORDS.contains(&word.as_str()) {
                return true;
            }
        }
        false
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new()
    }
}
