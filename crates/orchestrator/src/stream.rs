//! Streaming output formatting.
//!
//! A stateful session that accepts raw text chunks as they arrive and
//! emits cleaned chunks into a channel. Three concerns drive the state
//! machine:
//!
//! - Early chunks are buffered until the text is recognizably content (or
//!   a size threshold is hit), so the one-shot cleanup pass can strip a
//!   leading preamble before anything reaches the user.
//! - Internal-only blocks are suppressed entirely, even when their tags
//!   are split across arbitrary chunk boundaries: a chunk tail that could
//!   be the start of a tag is withheld and prefixed onto the next chunk.
//! - The session always reaches its flushed terminal state; a dropped
//!   receiver (user navigated away) stops emission but not state cleanup,
//!   and an unterminated internal block is discarded, never leaked.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::formatter::{clean, looks_clean};
use crate::markup::{tag_prefix_holdback, INTERNAL_CLOSE, INTERNAL_OPEN};

/// Buffered bytes before the session stops waiting for a content-start.
pub const STREAM_BUFFER_THRESHOLD: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Accumulating until the opening of the response can be judged.
    Buffering,
    /// Cleaned opening emitted; chunks now pass straight through.
    Passthrough,
}

/// One streaming formatting session.
///
/// Owned by exactly one response; consumed by [`StreamFormatter::flush`].
pub struct StreamFormatter {
    tx: mpsc::Sender<String>,
    phase: Phase,
    buffer: String,
    in_internal_block: bool,
    internal_buffer: String,
    holdback: String,
    closed: bool,
}

impl StreamFormatter {
    /// Start a session emitting into `tx`.
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            tx,
            phase: Phase::Buffering,
            buffer: String::new(),
            in_internal_block: false,
            internal_buffer: String::new(),
            holdback: String::new(),
            closed: false,
        }
    }

    /// Feed one raw chunk into the session.
    pub async fn feed(&mut self, chunk: &str) {
        let mut data = std::mem::take(&mut self.holdback);
        data.push_str(chunk);
        self.scan(data).await;
    }

    /// End the session: force-format anything still buffered, discard an
    /// unterminated internal block, and release the channel.
    pub async fn flush(mut self) {
        let leftover = std::mem::take(&mut self.holdback);

        if self.in_internal_block {
            // The withheld tail belonged to the block; everything goes.
            warn!(
                discarded = self.internal_buffer.len() + leftover.len(),
                "unterminated internal block discarded at stream end"
            );
        } else if !leftover.is_empty() {
            // The withheld tail is by construction a possible tag prefix;
            // with no next chunk to disambiguate it, suppress it rather
            // than risk leaking a truncated tag.
            debug!(suppressed = leftover.len(), "tag-prefix tail dropped at stream end");
        }

        if self.phase == Phase::Buffering {
            let buffered = std::mem::take(&mut self.buffer);
            let cleaned = clean(&buffered);
            if !cleaned.is_empty() {
                self.send(cleaned).await;
            }
        }
        debug!("stream session flushed");
    }

    /// Scan `data` for internal-block tags, routing visible text onward.
    async fn scan(&mut self, data: String) {
        let mut rest = data.as_str();

        loop {
            if self.in_internal_block {
                match rest.find(INTERNAL_CLOSE) {
                    Some(pos) => {
                        self.internal_buffer.push_str(&rest[..pos]);
                        debug!(
                            discarded = self.internal_buffer.len(),
                            "internal block suppressed from stream"
                        );
                        self.internal_buffer.clear();
                        self.in_internal_block = false;
                        rest = &rest[pos + INTERNAL_CLOSE.len()..];
                    }
                    None => {
                        let hold = tag_prefix_holdback(rest);
                        let keep = rest.len() - hold;
                        self.internal_buffer.push_str(&rest[..keep]);
                        self.holdback = rest[keep..].to_string();
                        return;
                    }
                }
            } else {
                match rest.find(INTERNAL_OPEN) {
                    Some(pos) => {
                        let visible = &rest[..pos];
                        self.emit(visible).await;
                        self.in_internal_block = true;
                        rest = &rest[pos + INTERNAL_OPEN.len()..];
                    }
                    None => {
                        let hold = tag_prefix_holdback(rest);
                        let keep = rest.len() - hold;
                        self.emit(&rest[..keep]).await;
                        self.holdback = rest[keep..].to_string();
                        return;
                    }
                }
            }
        }
    }

    /// Route visible text through the current phase.
    async fn emit(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.phase {
            Phase::Passthrough => self.send(text.to_string()).await,
            Phase::Buffering => {
                self.buffer.push_str(text);
                let ready = looks_clean(&self.buffer)
                    || self.buffer.len() >= STREAM_BUFFER_THRESHOLD;
                if ready {
                    // One cleanup pass over the opening, preserving the
                    // trailing whitespace so reassembly stays exact.
                    let buffered = std::mem::take(&mut self.buffer);
                    let trailing: String = buffered
                        .chars()
                        .rev()
                        .take_while(|c| c.is_whitespace())
                        .collect::<Vec<_>>()
                        .into_iter()
                        .rev()
                        .collect();
                    let cleaned = clean(&buffered);
                    self.phase = Phase::Passthrough;
                    if !cleaned.is_empty() {
                        self.send(format!("{}{}", cleaned, trailing)).await;
                    }
                }
            }
        }
    }

    async fn send(&mut self, chunk: String) {
        if self.closed || chunk.is_empty() {
            return;
        }
        if self.tx.send(chunk).await.is_err() {
            // Receiver dropped: the stream was cancelled downstream.
            warn!("stream receiver dropped, suppressing further output");
            self.closed = true;
        }
    }
}
