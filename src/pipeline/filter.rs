//! Transcript quality gate.
//!
//! STT engines emit placeholder artifacts on non-speech audio, typically
//! bracketed markers like `[BLANK_AUDIO]` or bare words like `silence`.
//! Passing these downstream produces nonsense responses, so the orchestrator
//! drops the turn silently when the transcript matches.

/// Placeholder phrases emitted by STT engines for non-speech audio.
/// Compared trimmed and case-insensitively.
const GARBAGE_PHRASES: &[&str] = &[
    "[blank_audio]",
    "[inaudible]",
    "[music]",
    "[silence]",
    "[noise]",
    "(music)",
    "(noise)",
    "(inaudible)",
    "silence",
    "noise",
    "typing",
    "inaudible",
    "blank_audio",
    "thank you.",
];

/// Decides whether a transcription is a recognition artifact rather than
/// user speech.
#[derive(Debug, Clone)]
pub struct TranscriptFilter {
    denylist: Vec<String>,
}

impl Default for TranscriptFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptFilter {
    pub fn new() -> Self {
        Self {
            denylist: GARBAGE_PHRASES.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Extend the built-in denylist with caller-supplied phrases
    /// (pre-lowercased for exact-match comparison at runtime).
    pub fn with_phrases(mut self, phrases: Vec<String>) -> Self {
        self.denylist
            .extend(phrases.into_iter().map(|p| p.to_lowercase()));
        self
    }

    /// Whether `text` should be discarded without a turn.
    ///
    /// True for empty/whitespace-only text, any exact denylist match, and
    /// any transcript that begins with `[` or `(` (bracketed STT markers
    /// come in too many variants to enumerate).
    pub fn is_garbage(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return true;
        }
        if trimmed.starts_with('[') || trimmed.starts_with('(') {
            return true;
        }
        let lower = trimmed.to_lowercase();
        self.denylist.iter().any(|phrase| phrase == &lower)
    }
}
