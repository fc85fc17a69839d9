//! Internal-only markup handling.
//!
//! Specialists emit `<vehicle_notes>` blocks for downstream persistence
//! (garage updates, session memory). These blocks must never reach the
//! user: every output path strips them, and the streaming formatter
//! suppresses them even when a tag is split across chunk boundaries.

/// Opening tag of an internal-only block.
pub const INTERNAL_OPEN: &str = "<vehicle_notes>";

/// Closing tag of an internal-only block.
pub const INTERNAL_CLOSE: &str = "</vehicle_notes>";

/// Remove every internal block from `text`.
///
/// An unterminated block is stripped to the end of the text rather than
/// leaked.
pub fn strip_internal_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(INTERNAL_OPEN) {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + INTERNAL_OPEN.len()..];
        match after_open.find(INTERNAL_CLOSE) {
            Some(close) => {
                rest = &after_open[close + INTERNAL_CLOSE.len()..];
            }
            None => {
                // Unterminated block: discard through end of text.
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Length of the suffix of `text` that could be the start of a split tag.
///
/// Used by the streaming formatter to withhold a suspicious tail until the
/// next chunk disambiguates it. Returns 0 when the tail is definitely not
/// a tag prefix.
pub fn tag_prefix_holdback(text: &str) -> usize {
    // Only a suffix shorter than a full tag can be a split prefix; full
    // tags are handled by the block scanner.
    let max_check = INTERNAL_CLOSE.len() - 1;
    let bytes = text.as_bytes();
    let start = text.len().saturating_sub(max_check);

    for i in (start..text.len()).rev() {
        if bytes[i] == b'<' {
            let suffix = &text[i..];
            if INTERNAL_OPEN.starts_with(suffix) || INTERNAL_CLOSE.starts_with(suffix) {
                return text.len() - i;
            }
        }
    }
    0
}
