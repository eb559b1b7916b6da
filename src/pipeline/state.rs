//! Session-wide pipeline state machine.

use std::sync::RwLock;
use tracing::debug;

/// Phase of the conversation loop. Exactly one per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Not running, or shut down.
    Idle,
    /// Accepting audio and watching for speech.
    Listening,
    /// An utterance ended; transcription is in flight.
    ProcessingSpeech,
    /// Transcript accepted; the language model is streaming a response.
    GeneratingResponse,
    /// Synthesized speech is being played.
    PlayingTts,
    /// Post-playback settle window before listening resumes.
    Cooldown,
}

impl PipelineState {
    /// Whether the edge `self -> to` is in the legal transition set.
    fn allows(self, to: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, to),
            (Idle, Listening)
                | (Listening, ProcessingSpeech)
                | (Listening, Idle)
                | (ProcessingSpeech, GeneratingResponse)
                | (ProcessingSpeech, Listening)
                | (ProcessingSpeech, Idle)
                | (GeneratingResponse, PlayingTts)
                | (GeneratingResponse, Listening)
                | (GeneratingResponse, Idle)
                | (PlayingTts, Cooldown)
                | (PlayingTts, Idle)
                | (Cooldown, Listening)
                | (Cooldown, Idle)
        )
    }
}

/// Validated holder for the session state.
///
/// `transition` is the only mutation path. Readers never block each other;
/// writes exclude everything for the duration of the swap only.
#[derive(Debug)]
pub struct PipelineStateMachine {
    state: RwLock<PipelineState>,
}

impl Default for PipelineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStateMachine {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PipelineState::Idle),
        }
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        match self.state.read() {
            Ok(guard) => *guard,
            // A poisoned lock still holds a valid state value.
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Attempt the edge to `to`. Returns `true` if the transition was
    /// taken, `false` (no state change) if already in `to` or the edge is
    /// not legal.
    pub fn transition(&self, to: PipelineState) -> bool {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let from = *guard;
        if from == to || !from.allows(to) {
            debug!("rejected state transition {from:?} -> {to:?}");
            return false;
        }
        debug!("state transition {from:?} -> {to:?}");
        *guard = to;
        true
    }
}
