//! Sentence chunking of streamed reply text.
//!
//! Deltas are appended to a buffer; whenever the buffer starts with a
//! complete sentence (terminated by `.`, `!` or `?` and followed by
//! whitespace) that prefix is cut off as a [`Fragment`]. Terminator-free text
//! longer than the threshold is flushed whole so speech never stalls on a
//! run-on reply.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default length (in characters) after which unterminated text is flushed.
pub const DEFAULT_MAX_FRAGMENT_CHARS: usize = 120;

static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?s).+?[.!?]\s+").expect("sentence pattern is valid"));

/// A piece of reply text selected for independent synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    sequence: u64,
    raw: String,
}

impl Fragment {
    pub fn new(sequence: u64, raw: impl Into<String>) -> Self {
        Self {
            sequence,
            raw: raw.into(),
        }
    }

    /// Position within the turn, starting at zero.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Text as cut from the stream, surrounding whitespace included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Text sent to the synthesizer and the client.
    pub fn text(&self) -> &str {
        self.raw.trim()
    }
}

/// Incremental sentence splitter for one turn.
#[derive(Debug)]
pub struct SentenceChunker {
    buffer: String,
    next_sequence: u64,
    max_chars: usize,
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAGMENT_CHARS)
    }
}

impl SentenceChunker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            buffer: String::new(),
            next_sequence: 0,
            max_chars: max_chars.max(1),
        }
    }

    /// Append a delta and return every fragment that became ready.
    pub fn push(&mut self, delta: &str) -> Vec<Fragment> {
        self.buffer.push_str(delta);
        let mut ready = Vec::new();

        loop {
            if let Some(end) = SENTENCE.find(&self.buffer).map(|m| m.end()) {
                let rest = self.buffer.split_off(end);
                let sentence = std::mem::replace(&mut self.buffer, rest);
                ready.push(self.emit(sentence));
                continue;
            }
            if self.buffer.chars().count() > self.max_chars && !is_blank(&self.buffer) {
                let all = std::mem::take(&mut self.buffer);
                ready.push(self.emit(all));
            }
            break;
        }
        ready
    }

    /// End of stream: whatever non-blank text remains becomes the last fragment.
    pub fn finish(&mut self) -> Option<Fragment> {
        let rest = std::mem::take(&mut self.buffer);
        if is_blank(&rest) {
            return None;
        }
        Some(self.emit(rest))
    }

    /// Number of fragments emitted so far.
    pub fn emitted(&self) -> u64 {
        self.next_sequence
    }

    fn emit(&mut self, raw: String) -> Fragment {
        let fragment = Fragment::new(self.next_sequence, raw);
        self.next_sequence += 1;
        fragment
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}
