//! Response validation and contextual fallback.
//!
//! The last line of defense before formatting: a specialist's raw output
//! is checked for emptiness and internal-only markup, and replaced with a
//! templated fallback when unusable. Validation never fails and always
//! yields non-empty content.

use tracing::{error, warn};

use crate::markup::strip_internal_blocks;

/// Minimum user-facing length for a response to count as substantive.
pub const MIN_CONTENT_LENGTH: usize = 20;

/// Why a response failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Nothing there at all.
    Empty,
    /// Some prose, but below the minimum length.
    TooShort,
    /// The response was internal markup only - the specialist produced no
    /// user-facing output. This is a specialist bug, not a model hiccup.
    InternalOnly,
}

/// Outcome of validating one raw response.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub issue: Option<ValidationIssue>,
    pub used_fallback: bool,
    /// The content to continue the pipeline with; never empty.
    pub content: String,
}

/// Validate a specialist's raw output.
///
/// `tool_calls_used` selects the flavor of fallback when the output is
/// unusable: a user who just watched a parts search deserves a parts
/// flavored apology, not a generic one.
pub fn validate(raw_text: &str, tool_calls_used: &[String]) -> ValidationOutcome {
    let raw_trimmed = raw_text.trim();
    let stripped = strip_internal_blocks(raw_text);
    let visible = stripped.trim();

    if visible.len() >= MIN_CONTENT_LENGTH {
        return ValidationOutcome {
            valid: true,
            issue: None,
            used_fallback: false,
            content: raw_text.to_string(),
        };
    }

    let issue = if !raw_trimmed.is_empty() && visible.is_empty() {
        // Distinct bug condition: everything the specialist wrote was
        // internal-only markup.
        error!(
            raw_len = raw_trimmed.len(),
            "specialist produced internal markup with no user-facing output"
        );
        ValidationIssue::InternalOnly
    } else if visible.is_empty() {
        warn!("specialist produced empty output, substituting fallback");
        ValidationIssue::Empty
    } else {
        warn!(
            visible_len = visible.len(),
            "specialist output below minimum length, substituting fallback"
        );
        ValidationIssue::TooShort
    };

    ValidationOutcome {
        valid: false,
        issue: Some(issue),
        used_fallback: true,
        content: fallback_for(tool_calls_used).to_string(),
    }
}

/// Select a fallback template flavored by the tools the turn used.
fn fallback_for(tool_calls_used: &[String]) -> &'static str {
    let used = |name: &str| tool_calls_used.iter().any(|t| t == name);

    if used("part_search") {
        "I wasn't able to put together a solid parts answer just now. \
         Try telling me your car's year, make, model, and current mods, \
         and I'll pull up options that actually fit."
    } else if used("build_guides") {
        "I couldn't finish laying out that build plan. Give me your car, \
         rough budget, and what you want out of it (street, track, show) \
         and I'll map the stages out step by step."
    } else if used("listing_search") || used("market_analysis") {
        "I couldn't complete that market lookup just now. Tell me your \
         budget and must-haves and I'll take another pass at what's out \
         there."
    } else {
        "I wasn't able to put together a good answer to that one. Could \
         you rephrase or add a little detail about your car, and I'll take \
         another look?"
    }
}
